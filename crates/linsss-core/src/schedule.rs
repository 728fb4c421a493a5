//! Declarative render-pass schedule.
//!
//! Each pass declares the resources it reads and writes; [`Schedule::validate`]
//! checks that every read is produced by an earlier pass and that no resource
//! has two writers. The GPU backend records passes in schedule order, which is
//! what makes the producer-before-consumer guarantee hold on the device.

use crate::error::{CoreError, Result};

/// One render or compute pass and its data dependencies.
#[derive(Debug, Clone)]
pub struct PassDesc {
    pub name: &'static str,
    pub reads: Vec<&'static str>,
    pub writes: Vec<&'static str>,
}

impl PassDesc {
    pub fn new(
        name: &'static str,
        reads: impl IntoIterator<Item = &'static str>,
        writes: impl IntoIterator<Item = &'static str>,
    ) -> Self {
        Self {
            name,
            reads: reads.into_iter().collect(),
            writes: writes.into_iter().collect(),
        }
    }
}

/// An ordered list of passes forming one frame.
#[derive(Debug, Clone, Default)]
pub struct Schedule {
    passes: Vec<PassDesc>,
    /// Resources produced outside the frame loop (uploaded textures, meshes).
    external: Vec<&'static str>,
}

impl Schedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a resource that exists before the first pass runs.
    pub fn with_external(mut self, resource: &'static str) -> Self {
        self.external.push(resource);
        self
    }

    pub fn with_pass(mut self, pass: PassDesc) -> Self {
        self.passes.push(pass);
        self
    }

    pub fn passes(&self) -> &[PassDesc] {
        &self.passes
    }

    /// Checks producer-before-consumer ordering and the single-writer rule.
    pub fn validate(&self) -> Result<()> {
        let mut written: Vec<(&str, &str)> = self
            .external
            .iter()
            .map(|r| (*r, "<external>"))
            .collect();

        for pass in &self.passes {
            for read in &pass.reads {
                if !written.iter().any(|(r, _)| r == read) {
                    return Err(CoreError::UnsatisfiedRead {
                        pass: pass.name.to_string(),
                        resource: (*read).to_string(),
                    });
                }
            }
            for write in &pass.writes {
                if let Some((_, first)) = written.iter().find(|(r, _)| r == write) {
                    return Err(CoreError::DuplicateWriter {
                        resource: (*write).to_string(),
                        first: (*first).to_string(),
                        second: pass.name.to_string(),
                    });
                }
                written.push((write, pass.name));
            }
        }
        Ok(())
    }
}

/// The fixed LinSSS frame schedule.
///
/// `tsm_read`/`tsm_write` stand for whichever halves of the ping-pong pair
/// the current frame parity selects; the pair swap does not change the
/// dependency shape.
pub fn frame_schedule() -> Schedule {
    Schedule::new()
        .with_external("mesh")
        .with_external("bssrdf_w")
        .with_external("bssrdf_gw")
        .with_external("envmap")
        .with_external("tsm_read")
        .with_pass(PassDesc::new("light", ["mesh"], ["light_gbuffer"]))
        .with_pass(PassDesc::new(
            "direct",
            ["mesh", "light_gbuffer", "envmap"],
            ["direct_gbuffer"],
        ))
        .with_pass(PassDesc::new(
            "mip_chain",
            ["direct_gbuffer"],
            ["irradiance_mips"],
        ))
        .with_pass(PassDesc::new(
            "gauss_filter",
            ["irradiance_mips", "direct_gbuffer"],
            ["filtered_pyramid"],
        ))
        .with_pass(PassDesc::new(
            "accumulate",
            ["filtered_pyramid", "direct_gbuffer", "bssrdf_w", "bssrdf_gw"],
            ["subsurface"],
        ))
        .with_pass(PassDesc::new(
            "tsm",
            ["mesh", "light_gbuffer", "tsm_read", "bssrdf_w", "bssrdf_gw"],
            ["tsm_write"],
        ))
        .with_pass(PassDesc::new("tsm_resolve", ["tsm_write"], ["tsm"]))
        .with_pass(PassDesc::new(
            "deferred",
            ["direct_gbuffer", "subsurface", "tsm", "envmap"],
            ["hdr_scene"],
        ))
        .with_pass(PassDesc::new("postprocess", ["hdr_scene"], ["swapchain"]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_schedule_is_valid() {
        frame_schedule().validate().unwrap();
    }

    #[test]
    fn test_read_before_write_rejected() {
        let schedule = Schedule::new()
            .with_pass(PassDesc::new("consumer", ["tex"], ["out"]))
            .with_pass(PassDesc::new("producer", [], ["tex"]));
        let err = schedule.validate().unwrap_err();
        assert!(matches!(err, CoreError::UnsatisfiedRead { .. }));
    }

    #[test]
    fn test_duplicate_writer_rejected() {
        let schedule = Schedule::new()
            .with_pass(PassDesc::new("a", [], ["tex"]))
            .with_pass(PassDesc::new("b", [], ["tex"]));
        let err = schedule.validate().unwrap_err();
        assert!(matches!(err, CoreError::DuplicateWriter { .. }));
    }

    #[test]
    fn test_external_resources_satisfy_reads() {
        let schedule = Schedule::new()
            .with_external("mesh")
            .with_pass(PassDesc::new("draw", ["mesh"], ["out"]));
        schedule.validate().unwrap();
    }
}
