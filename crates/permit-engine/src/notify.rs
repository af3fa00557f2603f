//! The default notification channel: a structured log line per event.

use std::convert::Infallible;

use permit_core::collaborator::{Notification, Notifier};
use tracing::info;

#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
  type Error = Infallible;

  async fn notify(&self, notification: Notification) -> Result<(), Infallible> {
    match serde_json::to_string(&notification) {
      Ok(payload) => info!(target: "permit::notify", %payload, "notification"),
      Err(_) => info!(target: "permit::notify", ?notification, "notification"),
    }
    Ok(())
  }
}
