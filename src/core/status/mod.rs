//! Server and service status
//!
//! Player count through the Minecraft server list ping, and the colour of
//! the Mojang services the launcher depends on.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Protocol version sent in the handshake; servers answer status for any value
const PING_PROTOCOL: i32 = 754;
const MAX_PACKET: usize = 1 << 21;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerStatus {
    pub online: bool,
    pub players_online: u32,
    pub players_max: u32,
    pub version: Option<String>,
}

impl ServerStatus {
    pub fn offline() -> Self {
        Self::default()
    }
}

/// "PLAYERS 3/20" or "SERVER OFFLINE"
pub fn player_label(status: &ServerStatus) -> String {
    if status.online {
        format!("PLAYERS {}/{}", status.players_online, status.players_max)
    } else {
        "SERVER OFFLINE".to_string()
    }
}

fn write_varint(buf: &mut Vec<u8>, value: i32) {
    let mut value = value as u32;
    loop {
        if value & !0x7f == 0 {
            buf.push(value as u8);
            return;
        }
        buf.push((value & 0x7f) as u8 | 0x80);
        value >>= 7;
    }
}

fn write_string(buf: &mut Vec<u8>, value: &str) {
    write_varint(buf, value.len() as i32);
    buf.extend_from_slice(value.as_bytes());
}

/// Prefix a packet body with its length
fn frame(body: Vec<u8>) -> Vec<u8> {
    let mut packet = Vec::with_capacity(body.len() + 5);
    write_varint(&mut packet, body.len() as i32);
    packet.extend(body);
    packet
}

/// Decode a VarInt from the front of `buf`, returning the value and its length
fn read_varint_slice(buf: &[u8]) -> Result<(i32, usize)> {
    let mut value: u32 = 0;
    for (i, byte) in buf.iter().enumerate().take(5) {
        value |= ((byte & 0x7f) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value as i32, i + 1));
        }
    }
    bail!("Malformed VarInt")
}

async fn read_varint(stream: &mut TcpStream) -> Result<i32> {
    let mut value: u32 = 0;
    for i in 0..5 {
        let byte = stream.read_u8().await?;
        value |= ((byte & 0x7f) as u32) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value as i32);
        }
    }
    bail!("Malformed VarInt")
}

fn handshake(host: &str, port: u16) -> Vec<u8> {
    let mut body = Vec::new();
    write_varint(&mut body, 0x00);
    write_varint(&mut body, PING_PROTOCOL);
    write_string(&mut body, host);
    body.extend_from_slice(&port.to_be_bytes());
    write_varint(&mut body, 1);
    frame(body)
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    players: Option<Players>,
    #[serde(default)]
    version: Option<StatusVersion>,
}

#[derive(Debug, Deserialize)]
struct Players {
    online: u32,
    max: u32,
}

#[derive(Debug, Deserialize)]
struct StatusVersion {
    name: String,
}

fn parse_status(json: &str) -> Result<ServerStatus> {
    let response: StatusResponse =
        serde_json::from_str(json).context("Malformed status response")?;
    let (players_online, players_max) = response
        .players
        .map(|p| (p.online, p.max))
        .unwrap_or_default();
    Ok(ServerStatus {
        online: true,
        players_online,
        players_max,
        version: response.version.map(|v| v.name),
    })
}

/// Parse a status response packet body (packet id + JSON string)
fn parse_status_packet(body: &[u8]) -> Result<ServerStatus> {
    let (id, used) = read_varint_slice(body)?;
    if id != 0x00 {
        bail!("Unexpected packet id {:#x}", id);
    }
    let rest = &body[used..];
    let (len, used) = read_varint_slice(rest)?;
    let json = rest
        .get(used..used + len.max(0) as usize)
        .context("Truncated status response")?;
    parse_status(&String::from_utf8_lossy(json))
}

async fn ping_inner(host: &str, port: u16) -> Result<ServerStatus> {
    let mut stream = TcpStream::connect((host, port))
        .await
        .with_context(|| format!("Failed to connect to {}:{}", host, port))?;

    stream.write_all(&handshake(host, port)).await?;
    stream.write_all(&frame(vec![0x00])).await?;
    stream.flush().await?;

    let len = read_varint(&mut stream).await?;
    if len <= 0 || len as usize > MAX_PACKET {
        bail!("Invalid status packet length {}", len);
    }
    let mut body = vec![0u8; len as usize];
    stream.read_exact(&mut body).await?;
    parse_status_packet(&body)
}

/// Server list ping
pub async fn ping(host: &str, port: u16, timeout: Duration) -> Result<ServerStatus> {
    tokio::time::timeout(timeout, ping_inner(host, port))
        .await
        .context("Server status request timed out")?
}

/// Ping, treating any failure as offline
pub async fn server_status(host: &str, port: u16, timeout: Duration) -> ServerStatus {
    tracing::info!(target: "landing", "Refreshing Server Status");
    match ping(host, port, timeout).await {
        Ok(status) => status,
        Err(e) => {
            tracing::warn!(target: "landing", "Unable to refresh server status, assuming offline. {:#}", e);
            ServerStatus::offline()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Green,
    Yellow,
    Red,
    #[default]
    Grey,
}

impl StatusColor {
    pub fn hex(self) -> &'static str {
        match self {
            StatusColor::Green => "#a5c325",
            StatusColor::Yellow => "#eac918",
            StatusColor::Red => "#c32625",
            StatusColor::Grey => "#848484",
        }
    }
}

impl std::fmt::Display for StatusColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StatusColor::Green => "green",
            StatusColor::Yellow => "yellow",
            StatusColor::Red => "red",
            StatusColor::Grey => "grey",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceStatus {
    pub service: String,
    pub name: String,
    pub essential: bool,
    pub status: StatusColor,
}

/// Known services, all unknown (grey)
pub fn default_services() -> Vec<ServiceStatus> {
    [
        ("sessionserver.mojang.com", "Multiplayer Session Service", true),
        ("authserver.mojang.com", "Authentication Service", true),
        ("textures.minecraft.net", "Minecraft Skins", false),
        ("api.mojang.com", "Public API", false),
        ("minecraft.net", "Minecraft.net", false),
        ("account.mojang.com", "Mojang Accounts Website", false),
    ]
    .into_iter()
    .map(|(service, name, essential)| ServiceStatus {
        service: service.to_string(),
        name: name.to_string(),
        essential,
        status: StatusColor::Grey,
    })
    .collect()
}

/// Single colour summarising every service
///
/// Red dominates and yellow comes next. Only when no service is yellow or
/// red is the result green, or grey when every service is grey.
pub fn overall_status(services: &[ServiceStatus]) -> StatusColor {
    let mut status = StatusColor::Grey;
    let mut green = 0;
    let mut grey = 0;

    for service in services {
        if service.status == StatusColor::Yellow && status != StatusColor::Red {
            status = StatusColor::Yellow;
        } else if service.status == StatusColor::Red {
            status = StatusColor::Red;
        } else {
            if service.status == StatusColor::Grey {
                grey += 1;
            }
            green += 1;
        }
    }

    if green == services.len() {
        status = if grey == services.len() {
            StatusColor::Grey
        } else {
            StatusColor::Green
        };
    }
    status
}

/// Merge a status document (`[{"minecraft.net": "green"}, ...]`) into the defaults
fn apply_statuses(services: &mut [ServiceStatus], entries: Vec<HashMap<String, StatusColor>>) {
    for entry in entries {
        for (name, color) in entry {
            if let Some(service) = services.iter_mut().find(|s| s.service == name) {
                service.status = color;
            }
        }
    }
}

/// Fetch service statuses; grey defaults when no URL is configured or the fetch fails
pub async fn fetch_services(client: &reqwest::Client, url: &str) -> Vec<ServiceStatus> {
    let mut services = default_services();
    if url.is_empty() {
        return services;
    }

    tracing::info!(target: "landing", "Refreshing Mojang Statuses..");
    let result = async {
        client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<HashMap<String, StatusColor>>>()
            .await
    }
    .await;

    match result {
        Ok(entries) => apply_statuses(&mut services, entries),
        Err(e) => {
            tracing::warn!(target: "landing", "Unable to refresh Mojang service status.");
            tracing::debug!(target: "landing", "{}", e);
        }
    }
    services
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    fn services(colors: &[StatusColor]) -> Vec<ServiceStatus> {
        colors
            .iter()
            .map(|c| ServiceStatus {
                service: "s".to_string(),
                name: "S".to_string(),
                essential: true,
                status: *c,
            })
            .collect()
    }

    #[test]
    fn test_varint() {
        for (value, bytes) in [
            (0, vec![0x00]),
            (1, vec![0x01]),
            (300, vec![0xac, 0x02]),
            (25565, vec![0xdd, 0xc7, 0x01]),
            (-1, vec![0xff, 0xff, 0xff, 0xff, 0x0f]),
        ] {
            let mut buf = Vec::new();
            write_varint(&mut buf, value);
            assert_eq!(buf, bytes);
            assert_eq!(read_varint_slice(&buf).unwrap(), (value, bytes.len()));
        }
        assert!(read_varint_slice(&[0x80, 0x80]).is_err());
    }

    #[test]
    fn test_player_label() {
        let status = parse_status(r#"{"version":{"name":"1.16.5"},"players":{"online":3,"max":20}}"#).unwrap();
        assert_eq!(player_label(&status), "PLAYERS 3/20");
        assert_eq!(status.version.as_deref(), Some("1.16.5"));
        assert_eq!(player_label(&ServerStatus::offline()), "SERVER OFFLINE");
    }

    #[test]
    fn test_overall_status() {
        use StatusColor::*;
        assert_eq!(overall_status(&services(&[Green, Grey, Green])), Green);
        assert_eq!(overall_status(&services(&[Grey, Grey])), Grey);
        assert_eq!(overall_status(&services(&[Green, Yellow, Green])), Yellow);
        assert_eq!(overall_status(&services(&[Yellow, Red, Yellow])), Red);
        assert_eq!(overall_status(&services(&[Red, Green])), Red);
        assert_eq!(overall_status(&default_services()), Grey);
    }

    #[test]
    fn test_apply_statuses() {
        let mut list = default_services();
        let entries = serde_json::from_str(r#"[{"minecraft.net": "green"}, {"api.mojang.com": "red"}, {"unknown": "yellow"}]"#).unwrap();
        apply_statuses(&mut list, entries);
        let of = |s: &str| list.iter().find(|x| x.service == s).unwrap().status;
        assert_eq!(of("minecraft.net"), StatusColor::Green);
        assert_eq!(of("api.mojang.com"), StatusColor::Red);
        assert_eq!(of("authserver.mojang.com"), StatusColor::Grey);
    }

    #[tokio::test]
    async fn test_ping_local_server() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            // Handshake and status request
            let mut buf = vec![0u8; handshake("127.0.0.1", port).len() + 2];
            socket.read_exact(&mut buf).await.unwrap();
            assert_eq!(&buf[buf.len() - 2..], &[0x01, 0x00]);

            let mut body = Vec::new();
            write_varint(&mut body, 0x00);
            write_string(&mut body, r#"{"players":{"online":7,"max":50}}"#);
            socket.write_all(&frame(body)).await.unwrap();
        });

        let status = ping("127.0.0.1", port, Duration::from_secs(5)).await.unwrap();
        assert!(status.online);
        assert_eq!(player_label(&status), "PLAYERS 7/50");
    }

    #[tokio::test]
    async fn test_unreachable_server_is_offline() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let status = server_status("127.0.0.1", port, Duration::from_secs(2)).await;
        assert!(!status.online);
    }
}
