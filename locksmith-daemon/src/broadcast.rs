//! Courtesy notice to logged-in terminals.
//!
//! Walks the utmp database, opens `/dev/<line>` for every user session and
//! writes a framed message on a detached task. Failures are ignored; the
//! only result is how many lines were opened.

use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use crate::paths::{DEV_DIR, UTMP_PATH};

/// Size of one `struct utmp` record on Linux.
const UTMP_RECORD_LEN: usize = 384;
const UT_LINE_OFFSET: usize = 8;
const UT_LINE_LEN: usize = 32;
const USER_PROCESS: i16 = 7;

const COLUMNS: usize = 79;

pub trait Broadcaster: Send + Sync {
    /// Best-effort write of `msg` to every interactive session. Returns the
    /// number of terminals reached.
    fn broadcast(&self, msg: &str) -> usize;
}

#[derive(Debug, Clone)]
pub struct UtmpBroadcaster {
    utmp: PathBuf,
    dev: PathBuf,
}

impl UtmpBroadcaster {
    pub fn new(utmp: impl Into<PathBuf>, dev: impl Into<PathBuf>) -> Self {
        Self {
            utmp: utmp.into(),
            dev: dev.into(),
        }
    }
}

impl Default for UtmpBroadcaster {
    fn default() -> Self {
        Self::new(UTMP_PATH, DEV_DIR)
    }
}

impl Broadcaster for UtmpBroadcaster {
    fn broadcast(&self, msg: &str) -> usize {
        let lines = match user_lines(&self.utmp) {
            Ok(lines) => lines,
            Err(err) => {
                tracing::debug!(path = %self.utmp.display(), error = %err, "cannot read utmp");
                return 0;
            }
        };

        let notice = frame(
            &format!(
                "Broadcast message from locksmithd at {}:",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S %Z")
            ),
            msg,
        );

        let mut reached = 0;
        for line in lines {
            let Ok(tty) = OpenOptions::new().write(true).open(self.dev.join(&line)) else {
                continue;
            };
            reached += 1;
            let notice = notice.clone();
            tokio::spawn(async move {
                let mut tty = tokio::fs::File::from_std(tty);
                let _ = tty.write_all(notice.as_bytes()).await;
                let _ = tty.flush().await;
            });
        }
        reached
    }
}

/// Terminal lines of all user-process records in a utmp file.
fn user_lines(utmp: &Path) -> std::io::Result<Vec<String>> {
    let raw = fs::read(utmp)?;
    Ok(raw
        .chunks_exact(UTMP_RECORD_LEN)
        .filter(|record| i16::from_ne_bytes([record[0], record[1]]) == USER_PROCESS)
        .filter_map(|record| {
            let field = &record[UT_LINE_OFFSET..UT_LINE_OFFSET + UT_LINE_LEN];
            let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
            let line = String::from_utf8_lossy(&field[..end]).into_owned();
            (!line.is_empty() && !line.split('/').any(|part| part == "..")).then_some(line)
        })
        .collect())
}

fn frame(header: &str, msg: &str) -> String {
    let blank = format!("\r{:w$}\r\n", " ", w = COLUMNS);
    format!(
        "{blank}{header:<w$.w$}\x07\x07\r\n{msg:<w$.w$}\r\n{blank}",
        w = COLUMNS
    )
}
