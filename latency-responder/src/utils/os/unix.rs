use rama::telemetry::tracing;

/// Raise the soft limit of open file descriptors up to `target`,
/// capped by the hard limit. Slow responses keep a lot of sockets open.
pub fn raise_nofile(target: u64) -> std::io::Result<()> {
    use std::{io, mem};

    // SAFETY: `lim` is a plain C struct owned by this frame,
    // only passed by pointer to getrlimit/setrlimit.
    unsafe {
        let mut lim: libc::rlimit = mem::zeroed();
        if libc::getrlimit(libc::RLIMIT_NOFILE, &mut lim) != 0 {
            return Err(io::Error::last_os_error());
        }

        let hard = lim.rlim_max as u64;
        let new_soft = target.min(hard);

        if lim.rlim_cur as u64 >= new_soft {
            tracing::debug!(
                "ulimit: current soft limit ({}) >= requested ({new_soft}); keep it",
                lim.rlim_cur,
            );
            return Ok(());
        }

        let previous = lim.rlim_cur;
        lim.rlim_cur = new_soft as libc::rlim_t;
        if libc::setrlimit(libc::RLIMIT_NOFILE, &lim) != 0 {
            return Err(io::Error::last_os_error());
        }
        tracing::info!("ulimit: raised soft limit to {new_soft} (was {previous})");
    }

    Ok(())
}
