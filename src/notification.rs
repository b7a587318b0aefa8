//! Desktop notifications
//!
//! Uses notify-send (libnotify). Notifications are best-effort: a missing
//! notify-send or a dead notification daemon is logged at debug level and
//! otherwise ignored.

use std::process::Stdio;
use tokio::process::Command;

/// How long a notification stays on screen
const EXPIRE_MS: u32 = 2000;

fn notify_args(title: &str, body: &str) -> Vec<String> {
    vec![
        "--app-name=Spin".to_string(),
        format!("--expire-time={}", EXPIRE_MS),
        title.to_string(),
        body.to_string(),
    ]
}

/// Send a desktop notification with the given title and body.
pub async fn send(title: &str, body: &str) {
    let result = Command::new("notify-send")
        .args(notify_args(title, body))
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    if let Err(e) = result {
        tracing::debug!("Failed to send notification: {}", e);
    }
}

/// Notification text for a rotation-lock change
pub fn rotation_lock_message(locked: bool) -> (&'static str, &'static str) {
    if locked {
        ("Rotation lock", "Screen rotation is locked")
    } else {
        ("Rotation lock", "Screen rotation follows the accelerometer")
    }
}
