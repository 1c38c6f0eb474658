use super::client::BotClient;
use super::handler::handle_update;
use crate::application::TransferService;
use crate::config::AccessList;
use crate::domain::av::RemuxRunner;
use std::sync::Arc;
use std::time::Duration;

/// Seconds the Bot API may hold a `getUpdates` call open.
const POLL_WAIT_SECS: u64 = 30;
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Long-polling loop. Each update runs on its own task, so requests from
/// different chats proceed independently.
pub struct Poller<R> {
    client: BotClient,
    access: Arc<AccessList>,
    service: Arc<TransferService<R>>,
}

impl<R> Poller<R>
where
    R: RemuxRunner + 'static,
{
    pub fn new(client: BotClient, access: AccessList, service: TransferService<R>) -> Self {
        Self {
            client,
            access: Arc::new(access),
            service: Arc::new(service),
        }
    }

    pub async fn run(&self) {
        tracing::info!("Polling for updates");
        let mut offset = 0;

        loop {
            let updates = match self.client.get_updates(offset, POLL_WAIT_SECS).await {
                Ok(updates) => updates,
                Err(e) => {
                    tracing::warn!("getUpdates failed: {}", e);
                    tokio::time::sleep(RETRY_DELAY).await;
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let client = self.client.clone();
                let access = self.access.clone();
                let service = self.service.clone();
                tokio::spawn(async move {
                    handle_update(&client, &access, &service, update).await;
                });
            }
        }
    }
}
