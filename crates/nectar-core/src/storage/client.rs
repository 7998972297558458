//! ============================================================================
//! Storage Client - content-addressed gateway over HTTP
//! ============================================================================
//! Uploads, downloads and removes files against a remote content-addressed
//! gateway. Uploads go up as multipart form data and come back as a content
//! hash; downloads arrive as a tar archive whose first file entry is the
//! content. An optional hex secret applies the AES-GCM envelope on the way
//! in and out.
//! ============================================================================

use anyhow::{anyhow, bail, Context, Result};
use serde::Deserialize;
use std::io::Read;
use tracing::{debug, info};

use super::envelope;

/// Client for one gateway endpoint, authenticated with a bearer token.
pub struct StorageClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

#[derive(Deserialize)]
struct AddResponse {
    #[serde(rename = "Hash")]
    hash: Option<String>,
}

#[derive(Deserialize)]
struct GatewayError {
    #[serde(rename = "Message")]
    message: String,
}

impl StorageClient {
    /// Create a client for the gateway at `url` with the given API token.
    pub fn new(url: impl Into<String>, token: impl Into<String>) -> Result<Self> {
        let url = url.into();
        let token = token.into();
        if url.is_empty() {
            bail!("url is required");
        }
        if token.is_empty() {
            bail!("token is required");
        }

        Ok(Self {
            client: reqwest::Client::new(),
            base_url: url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Upload `data` under `filename` (which must carry an extension) and
    /// return the gateway's content hash. With `secret`, the bytes are
    /// sealed in the encryption envelope before they leave the process.
    pub async fn upload(&self, data: &[u8], filename: &str, secret: Option<&str>) -> Result<String> {
        if data.is_empty() {
            bail!("buffer is required");
        }
        match filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => {}
            _ => bail!("filename extension is missing"),
        }

        let payload = match secret {
            Some(secret) => envelope::seal(secret, data)?,
            None => data.to_vec(),
        };

        let part = reqwest::multipart::Part::bytes(payload).file_name(filename.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);

        debug!("Uploading {} ({} bytes)", filename, data.len());

        let response = self
            .client
            .post(format!("{}/add", self.base_url))
            .query(&[("stream-channels", "true"), ("pin", "true"), ("progress", "false")])
            .header("Authorization", format!("Bearer {}", self.token))
            .multipart(form)
            .send()
            .await
            .context("upload request failed")?;

        if !response.status().is_success() {
            bail!("gateway returned {} during upload", response.status());
        }

        let body: AddResponse = response.json().await.context("malformed upload response")?;
        let hash = body
            .hash
            .ok_or_else(|| anyhow!("an error occurred during uploading"))?;

        info!("Uploaded {} as {}", filename, hash);
        Ok(hash)
    }

    /// Download the content stored under `hash`. The gateway wraps content
    /// in a tar archive; the first file entry is extracted and, with
    /// `secret`, opened from the encryption envelope.
    pub async fn download(&self, hash: &str, secret: Option<&str>) -> Result<Vec<u8>> {
        let response = self
            .client
            .post(format!("{}/get", self.base_url))
            .query(&[("arg", format!("/btfs/{hash}"))])
            .header("Authorization", format!("Bearer {}", self.token))
            .send()
            .await
            .context("download request failed")?;

        if !response.status().is_success() {
            return Err(self.gateway_error(response).await);
        }

        let archive = response.bytes().await.context("download body failed")?;
        let content = extract_first_file(&archive)?;

        match secret {
            Some(secret) => envelope::open(secret, &content),
            None => Ok(content),
        }
    }

    /// Remove the file stored under `filename` from the gateway.
    pub async fn remove(&self, filename: &str) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/files/rm", self.base_url))
            .query(&[("arg", format!("/{filename}"))])
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Content-Type", "application/json")
            .send()
            .await
            .context("remove request failed")?;

        if !response.status().is_success() {
            return Err(self.gateway_error(response).await);
        }

        info!("Removed {}", filename);
        Ok(())
    }

    /// Surface the gateway's own error message when it sends one.
    async fn gateway_error(&self, response: reqwest::Response) -> anyhow::Error {
        let status = response.status();
        match response.json::<GatewayError>().await {
            Ok(body) => anyhow!("{}", body.message),
            Err(_) => anyhow!("gateway returned {status}"),
        }
    }
}

/// Pull the first regular file out of a tar archive.
fn extract_first_file(archive: &[u8]) -> Result<Vec<u8>> {
    let mut archive = tar::Archive::new(archive);
    for entry in archive.entries().context("malformed tar archive")? {
        let mut entry = entry.context("malformed tar entry")?;
        if entry.header().entry_type().is_file() {
            let mut content = Vec::new();
            entry
                .read_to_end(&mut content)
                .context("failed to read archive entry")?;
            return Ok(content);
        }
    }
    bail!("archive contained no file entry")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tar_with(entries: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, content) in entries.iter().copied() {
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, content).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn test_client_requires_url_and_token() {
        assert!(StorageClient::new("", "token").is_err());
        assert!(StorageClient::new("https://gw.example", "").is_err());
        assert!(StorageClient::new("https://gw.example", "token").is_ok());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = StorageClient::new("https://gw.example/", "token").unwrap();
        assert_eq!(client.base_url, "https://gw.example");
    }

    #[test]
    fn test_extract_first_file() {
        let archive = tar_with(&[("manifest.json", b"{\"ok\":true}")]);
        assert_eq!(extract_first_file(&archive).unwrap(), b"{\"ok\":true}");
    }

    #[test]
    fn test_extract_picks_first_of_many() {
        let archive = tar_with(&[("a.bin", b"first"), ("b.bin", b"second")]);
        assert_eq!(extract_first_file(&archive).unwrap(), b"first");
    }

    #[test]
    fn test_extract_empty_archive_fails() {
        let archive = tar_with(&[]);
        assert!(extract_first_file(&archive).is_err());
    }

    #[tokio::test]
    async fn test_upload_requires_extension() {
        let client = StorageClient::new("https://gw.example", "token").unwrap();
        assert!(client.upload(b"data", "noext", None).await.is_err());
        assert!(client.upload(b"data", ".hidden", None).await.is_err());
        assert!(client.upload(b"", "file.bin", None).await.is_err());
    }
}
