//! Settings panel.

use egui::{ComboBox, Context, Slider};
use linsss_core::params::{LightKind, MaterialKind, MeshKind};
use linsss_core::RenderParameters;

fn light_label(light: LightKind) -> &'static str {
    match light {
        LightKind::Point => "Point light",
        LightKind::Uffizi => "Uffizi gallery",
        LightKind::Grace => "Grace cathedral",
    }
}

fn material_label(material: MaterialKind) -> &'static str {
    match material {
        MaterialKind::HeartSoap => "Heart soap",
        MaterialKind::Marble => "Marble",
    }
}

fn mesh_label(mesh: MeshKind) -> &'static str {
    match mesh {
        MeshKind::Fertility => "Fertility",
        MeshKind::Armadillo => "Armadillo",
    }
}

/// Builds the settings window, mutating `params` in place.
pub fn settings_panel(ctx: &Context, params: &mut RenderParameters) {
    egui::Window::new("Settings")
        .default_width(260.0)
        .show(ctx, |ui| {
            ComboBox::from_label("Light")
                .selected_text(light_label(params.light))
                .show_ui(ui, |ui| {
                    for kind in [LightKind::Point, LightKind::Uffizi, LightKind::Grace] {
                        ui.selectable_value(&mut params.light, kind, light_label(kind));
                    }
                });
            ComboBox::from_label("Material")
                .selected_text(material_label(params.material))
                .show_ui(ui, |ui| {
                    for kind in [MaterialKind::HeartSoap, MaterialKind::Marble] {
                        ui.selectable_value(&mut params.material, kind, material_label(kind));
                    }
                });
            ComboBox::from_label("Mesh")
                .selected_text(mesh_label(params.mesh))
                .show_ui(ui, |ui| {
                    for kind in [MeshKind::Fertility, MeshKind::Armadillo] {
                        ui.selectable_value(&mut params.mesh, kind, mesh_label(kind));
                    }
                });

            ui.separator();

            ui.add(Slider::new(&mut params.irr_scale, 0.0..=10.0).text("Irradiance scale"));
            ui.add(Slider::new(&mut params.tex_scale, 0.5..=2.0).text("Texture scale"));
            ui.add(Slider::new(&mut params.tex_offset_x, -1.0..=1.0).text("Texture offset X"));
            ui.add(Slider::new(&mut params.tex_offset_y, -1.0..=1.0).text("Texture offset Y"));
            ui.add(Slider::new(&mut params.sigma_scale, 0.0..=16.0).text("Sigma scale"));

            ui.separator();

            ui.checkbox(&mut params.enable_tsm, "Translucent shadow map");
        });
}
