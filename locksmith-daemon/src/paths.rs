use std::time::Duration;

pub const UTMP_PATH: &str = "/var/run/utmp";
pub const DEV_DIR: &str = "/dev";

/// Pause after warning logged-in users before the reboot is sent.
pub const LOGINS_REBOOT_DELAY: Duration = Duration::from_secs(5 * 60);

/// How long to wait for the reboot to take this process down.
pub const REBOOT_CONFIRM_WAIT: Duration = Duration::from_secs(7 * 24 * 60 * 60);

pub const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(10);
