//! Newline-delimited JSON replay transport

use super::{ConnectionError, Frame, FrameStream, Transport};
use crate::constants::{ABNORMAL_CLOSURE, NORMAL_CLOSURE};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use url::Url;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Source {
    Path(PathBuf),
    Stdin,
}

/// Replays one message per non-blank line, then closes cleanly
///
/// The endpoint passed to [`Transport::open`] is ignored; the source is fixed
/// at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTransport {
    source: Source,
}

impl FileTransport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            source: Source::Path(path.into()),
        }
    }

    pub fn stdin() -> Self {
        Self {
            source: Source::Stdin,
        }
    }

    /// `-` selects stdin, anything else is a path
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            Self::stdin()
        } else {
            Self::new(arg)
        }
    }

    /// A `file://` URL naming the source, for logging and events
    pub fn endpoint(&self) -> Result<Url, ConnectionError> {
        let path = match &self.source {
            Source::Stdin => PathBuf::from("/dev/stdin"),
            Source::Path(path) => std::path::absolute(path)
                .map_err(|e| ConnectionError::Io(format!("{}: {}", path.display(), e)))?,
        };
        Url::from_file_path(&path).map_err(|_| {
            ConnectionError::Io(format!("{} is not a valid file URL", path.display()))
        })
    }
}

#[async_trait]
impl Transport for FileTransport {
    async fn open(&self, _endpoint: &Url) -> Result<FrameStream, ConnectionError> {
        let reader: Box<dyn AsyncRead + Send + Unpin> = match &self.source {
            Source::Path(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .map_err(|e| ConnectionError::Io(format!("{}: {}", path.display(), e)))?;
                Box::new(file)
            }
            Source::Stdin => Box::new(tokio::io::stdin()),
        };

        let lines = BufReader::new(reader).lines();
        let frames = futures::stream::unfold(Some(lines), |state| async move {
            let mut lines = state?;
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) if line.trim().is_empty() => continue,
                    Ok(Some(line)) => return Some((Frame::Text(line), Some(lines))),
                    Ok(None) => return Some((Frame::Close(NORMAL_CLOSURE), None)),
                    Err(e) => {
                        tracing::warn!("Replay read failed: {}", e);
                        return Some((Frame::Close(ABNORMAL_CLOSURE), None));
                    }
                }
            }
        });
        Ok(frames.boxed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn any_url() -> Url {
        Url::parse("file:///ignored").unwrap()
    }

    #[tokio::test]
    async fn test_lines_then_clean_close() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{{\"namespaces\":{{}}}}").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "second").unwrap();

        let transport = FileTransport::new(file.path());
        let frames: Vec<Frame> = transport.open(&any_url()).await.unwrap().collect().await;
        assert_eq!(
            frames,
            vec![
                Frame::Text("{\"namespaces\":{}}".to_string()),
                Frame::Text("second".to_string()),
                Frame::Close(NORMAL_CLOSURE),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let transport = FileTransport::new(dir.path().join("absent.ndjson"));
        let result = transport.open(&any_url()).await;
        assert!(matches!(result, Err(ConnectionError::Io(_))));
    }

    #[test]
    fn test_endpoint_is_file_url() {
        let url = FileTransport::new("/tmp/feed.ndjson").endpoint().unwrap();
        assert_eq!(url.scheme(), "file");
        assert!(url.path().ends_with("feed.ndjson"));
        assert_eq!(FileTransport::from_arg("-"), FileTransport::stdin());
    }
}
