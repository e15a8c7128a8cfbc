use std::time::Duration;

use etcd_client::{Client, ConnectOptions, GetOptions, KeyValue};
use tokio::sync::Mutex;

use super::Etcd;

/// Lazily connected etcd client.
///
/// The connection is opened on first use, inside whatever runtime serves the
/// request, and dropped after a failed call so the next call reconnects.
pub struct EtcdClientWrapper {
    config: Etcd,
    client: Mutex<Option<Client>>,
}

impl EtcdClientWrapper {
    pub fn new(config: Etcd) -> Self {
        Self {
            config,
            client: Mutex::new(None),
        }
    }

    pub fn prefix(&self) -> &str {
        self.config.prefix.trim_end_matches('/')
    }

    fn prefixed(&self, key: &str) -> String {
        format!("{}/{}", self.prefix(), key)
    }

    async fn create_client(&self) -> Result<Client, etcd_client::Error> {
        let mut options = ConnectOptions::default();
        if let Some(timeout) = self.config.timeout {
            options = options.with_timeout(Duration::from_secs(timeout as u64));
        };
        if let Some(connect_timeout) = self.config.connect_timeout {
            options = options.with_connect_timeout(Duration::from_secs(connect_timeout as u64));
        };
        if let (Some(user), Some(password)) = (&self.config.user, &self.config.password) {
            options = options.with_user(user.clone(), password.clone());
        };

        Client::connect(self.config.host.clone(), Some(options)).await
    }

    /// Returns a handle to the shared connection, creating it if needed.
    /// `Client` is a cheap clone over one gRPC channel.
    async fn ensure_client(&self) -> Result<Client, etcd_client::Error> {
        let mut client_guard = self.client.lock().await;

        if let Some(client) = client_guard.as_ref() {
            return Ok(client.clone());
        }

        log::info!("Creating new etcd client...");
        let client = self.create_client().await?;
        *client_guard = Some(client.clone());
        Ok(client)
    }

    async fn reset_on_error<T>(
        &self,
        result: Result<T, etcd_client::Error>,
    ) -> Result<T, etcd_client::Error> {
        if let Err(err) = &result {
            log::error!("Etcd operation failed: {:?}", err);
            *self.client.lock().await = None;
        }
        result
    }

    pub async fn put(&self, key: &str, value: Vec<u8>) -> Result<(), etcd_client::Error> {
        let mut client = self.ensure_client().await?;
        let result = client.put(self.prefixed(key), value, None).await.map(|_| ());
        self.reset_on_error(result).await
    }

    pub async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, etcd_client::Error> {
        let mut client = self.ensure_client().await?;
        let result = client
            .get(self.prefixed(key), None)
            .await
            .map(|resp| resp.kvs().first().map(|kv| kv.value().to_vec()));
        self.reset_on_error(result).await
    }

    /// Values of every key under `{prefix}/{key_prefix}/`.
    pub async fn list(&self, key_prefix: &str) -> Result<Vec<Vec<u8>>, etcd_client::Error> {
        let mut client = self.ensure_client().await?;
        let options = GetOptions::new().with_prefix();
        let result = client
            .get(format!("{}/", self.prefixed(key_prefix)), Some(options))
            .await
            .map(|resp| resp.kvs().iter().map(KeyValue::value).map(<[u8]>::to_vec).collect());
        self.reset_on_error(result).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefixed_keys() {
        let wrapper = EtcdClientWrapper::new(Etcd {
            host: vec!["http://127.0.0.1:2379".to_string()],
            prefix: "/avalance/".to_string(),
            ..Etcd::default()
        });
        assert_eq!(wrapper.prefix(), "/avalance");
        assert_eq!(wrapper.prefixed("contacts/1"), "/avalance/contacts/1");
    }
}
