use log::{debug, info};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use tokio::time::Duration;

use crate::config::MonitorConfig;
use crate::error::{Error, Result};

const KEEP_ALIVE_SECS: u64 = 30;
const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// Build client options from the configuration.
///
/// The session is persistent so the broker keeps our subscription across
/// short drops.
pub fn mqtt_options(config: &MonitorConfig) -> MqttOptions {
    let client_id = format!("omni00-{}", rand::random::<u16>());
    let mut options = MqttOptions::new(client_id, config.host.clone(), config.port);
    options.set_keep_alive(Duration::from_secs(KEEP_ALIVE_SECS));
    options.set_clean_session(false);

    if let Some(username) = &config.username {
        options.set_credentials(username.clone(), config.password.clone().unwrap_or_default());
    }

    options
}

/// Connect to the broker and subscribe to the event topic.
///
/// Polls the event loop until the broker acknowledges the connection;
/// any error before that is returned as `Error::Connection`.
pub async fn connect(config: &MonitorConfig) -> Result<(AsyncClient, EventLoop)> {
    info!("Connecting to MQTT broker {}:{}", config.host, config.port);

    let (client, mut event_loop) = AsyncClient::new(mqtt_options(config), REQUEST_CHANNEL_CAPACITY);

    loop {
        match event_loop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                if ack.code != ConnectReturnCode::Success {
                    return Err(Error::Connection(format!(
                        "broker refused connection: {:?}",
                        ack.code
                    )));
                }
                info!("Connected to MQTT broker");
                break;
            }
            Ok(event) => debug!("MQTT event before connect: {:?}", event),
            Err(e) => {
                return Err(Error::Connection(format!(
                    "{}:{}: {}",
                    config.host, config.port, e
                )))
            }
        }
    }

    client
        .subscribe(config.topic.as_str(), QoS::AtMostOnce)
        .await
        .map_err(|e| Error::Connection(format!("subscribe to {} failed: {}", config.topic, e)))?;
    info!("Subscribed to {}", config.topic);

    Ok((client, event_loop))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Args, FileConfig};

    fn config(args: Args) -> MonitorConfig {
        MonitorConfig::resolve(args, FileConfig::default()).unwrap()
    }

    #[test]
    fn test_mqtt_options() {
        let options = mqtt_options(&config(Args {
            host: Some("pi4.local".into()),
            port: Some(1884),
            ..Default::default()
        }));

        assert_eq!(options.broker_address(), ("pi4.local".to_string(), 1884));
        assert_eq!(options.keep_alive(), Duration::from_secs(KEEP_ALIVE_SECS));
        assert!(!options.clean_session());
        assert!(options.client_id().starts_with("omni00-"));
        assert_eq!(options.credentials(), None);
    }

    #[test]
    fn test_mqtt_options_with_credentials() {
        let options = mqtt_options(&config(Args {
            username: Some("omni".into()),
            password: Some("secret".into()),
            ..Default::default()
        }));

        assert_eq!(
            options.credentials(),
            Some(("omni".to_string(), "secret".to_string()))
        );
    }
}
