//! Ambient logging setup (spec §9 design notes: "audit/logging" is an
//! external collaborator's concern, not core logic, but every production
//! crate in this corpus wires `log`+`fern` rather than printing directly).
//! The controller itself only emits at `debug!`/`warn!`/`error!` around
//! option preemption, reservation contention, settlement founding, and cache
//! lifecycle violations -- never `info!` on a per-tick path, since that would
//! flood output at a hundred-agents-per-tick workload.

use std::env;

/// Install a `fern` dispatcher writing to stderr at `level`. Call once from
/// the host process before the first `Controller::tick`.
pub fn init(level: log::LevelFilter) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!("[{}][{}] {}", record.target(), record.level(), message))
        })
        .level(level)
        .chain(std::io::stderr())
        .apply()
        .map_err(fern::InitError::SetLoggerError)
}

/// Audit verbosity selected by `TV_AI_LOG` (spec §6: "0/1/2 selecting
/// off/summary-every-50-steps/verbose-every-step"). Not part of the core
/// contract; a host may ignore this entirely and drive its own logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AuditLevel {
    Off,
    SummaryEvery50,
    Verbose,
}

impl AuditLevel {
    pub fn from_env() -> Self {
        match env::var("TV_AI_LOG").ok().as_deref() {
            Some("1") => AuditLevel::SummaryEvery50,
            Some("2") => AuditLevel::Verbose,
            _ => AuditLevel::Off,
        }
    }

    /// Whether a tick at `step` should emit an audit log line under this level.
    pub fn should_log(self, step: u32) -> bool {
        match self {
            AuditLevel::Off => false,
            AuditLevel::SummaryEvery50 => step % 50 == 0,
            AuditLevel::Verbose => true,
        }
    }
}

/// Emit one audit line for the tick if `level` calls for it at `step`.
pub fn audit_tick(level: AuditLevel, step: u32, agents_dispatched: usize) {
    if level.should_log(step) {
        log::info!("tick {step}: dispatched {agents_dispatched} agents");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_level_logs_only_on_multiples_of_fifty() {
        let level = AuditLevel::SummaryEvery50;
        assert!(level.should_log(0));
        assert!(level.should_log(50));
        assert!(!level.should_log(49));
    }

    #[test]
    fn off_level_never_logs() {
        assert!(!AuditLevel::Off.should_log(0));
        assert!(!AuditLevel::Off.should_log(50));
    }

    #[test]
    fn verbose_level_logs_every_step() {
        let level = AuditLevel::Verbose;
        for step in 0..10 {
            assert!(level.should_log(step));
        }
    }
}
