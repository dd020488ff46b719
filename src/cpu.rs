//! CPU affinity and real-time scheduling for pinned worker threads.
//!
//! Linux-only; every other platform degrades to a clean no-op so the engine
//! behaves identically (just without the pinning) elsewhere.

use crate::error::{ EngineError, Result };

#[cfg(target_os = "linux")]
pub fn pin_to_cpu(cpu: usize) -> Result<()> {
    use nix::sched::{ sched_setaffinity, CpuSet };
    use nix::unistd::Pid;

    let mut cpu_set = CpuSet::new();
    cpu_set.set(cpu).map_err(|err| EngineError::cpu_affinity(err.to_string()))?;
    sched_setaffinity(Pid::from_raw(0), &cpu_set).map_err(|err| EngineError::cpu_affinity(err.to_string()))
}

#[cfg(not(target_os = "linux"))]
pub fn pin_to_cpu(_cpu: usize) -> Result<()> {
    Ok(())
}

#[cfg(target_os = "linux")]
pub fn set_realtime_priority() -> Result<()> {
    use libc::{ sched_param, sched_setscheduler, SCHED_FIFO };
    unsafe {
        let mut param: sched_param = std::mem::zeroed();
        param.sched_priority = 99;
        let result = sched_setscheduler(0, SCHED_FIFO, &param);
        if result == 0 {
            Ok(())
        } else {
            Err(EngineError::cpu_affinity(std::io::Error::last_os_error().to_string()))
        }
    }
}

#[cfg(not(target_os = "linux"))]
pub fn set_realtime_priority() -> Result<()> {
    Ok(())
}
