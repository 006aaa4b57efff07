#[cfg(test)]
pub mod test {
    use std::fs;
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::path::Path;
    use std::thread::{self, JoinHandle};

    use tempfile::TempDir;

    use crate::error::BootstrapError;
    use crate::sink::Sink;

    /// A temp directory pre-populated with include files.
    pub struct IncludeDir {
        dir: TempDir,
    }

    impl IncludeDir {
        pub fn new(files: &[(&str, &str)]) -> Self {
            let dir = TempDir::new().unwrap();
            for (name, content) in files {
                fs::write(dir.path().join(name), content).unwrap();
            }
            Self { dir }
        }

        pub fn path(&self) -> &Path {
            self.dir.path()
        }
    }

    /// Sink that accepts writes until it sees `fail_key`, then errors.
    #[derive(Debug, Default)]
    pub struct FailingSink {
        pub fail_key: String,
        pub written: Vec<String>,
    }

    impl FailingSink {
        pub fn on(key: &str) -> Self {
            Self {
                fail_key: key.to_string(),
                written: Vec::new(),
            }
        }
    }

    impl Sink for FailingSink {
        fn put(&mut self, key: &str, _value: &[u8]) -> Result<(), BootstrapError> {
            if key == self.fail_key {
                return Err(BootstrapError::Write {
                    key: key.to_string(),
                    reason: "context deadline exceeded".into(),
                });
            }
            self.written.push(key.to_string());
            Ok(())
        }
    }

    /// One request seen by [`GatewayStub`].
    #[derive(Debug, Clone)]
    pub struct Recorded {
        pub path: String,
        pub body: String,
        pub authorization: Option<String>,
    }

    /// Minimal stand-in for the etcd JSON gateway.
    ///
    /// Serves exactly `requests` requests, one per connection, then stops.
    pub struct GatewayStub {
        addr: SocketAddr,
        handle: JoinHandle<Vec<Recorded>>,
    }

    impl GatewayStub {
        pub const TOKEN: &'static str = "stub-token";

        pub fn start(requests: usize) -> Self {
            Self::spawn(requests, None)
        }

        /// Like [`start`](Self::start), but replies 403 to requests for `fail_path`.
        pub fn start_with_failure(requests: usize, fail_path: &'static str) -> Self {
            Self::spawn(requests, Some(fail_path))
        }

        fn spawn(requests: usize, fail_path: Option<&'static str>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            let handle = thread::spawn(move || {
                let mut seen = Vec::new();
                while seen.len() < requests {
                    let (stream, _) = listener.accept().unwrap();
                    if let Some(recorded) = serve_one(stream, fail_path) {
                        seen.push(recorded);
                    }
                }
                seen
            });
            Self { addr, handle }
        }

        pub fn endpoint(&self) -> String {
            format!("http://{}", self.addr)
        }

        /// Wait for all expected requests and return them in arrival order.
        pub fn finish(self) -> Vec<Recorded> {
            self.handle.join().unwrap()
        }

        /// An endpoint nothing listens on.
        pub fn dead_endpoint() -> String {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);
            format!("http://{addr}")
        }
    }

    /// An endpoint that accepts connections but never answers.
    pub struct SilentEndpoint {
        listener: TcpListener,
    }

    impl SilentEndpoint {
        pub fn bind() -> Self {
            Self {
                listener: TcpListener::bind("127.0.0.1:0").unwrap(),
            }
        }

        pub fn endpoint(&self) -> String {
            format!("http://{}", self.listener.local_addr().unwrap())
        }
    }

    fn serve_one(stream: TcpStream, fail_path: Option<&str>) -> Option<Recorded> {
        let mut reader = BufReader::new(stream.try_clone().ok()?);

        let mut request_line = String::new();
        reader.read_line(&mut request_line).ok()?;
        let path = request_line.split_whitespace().nth(1)?.to_string();

        let mut content_length = 0;
        let mut authorization = None;
        loop {
            let mut line = String::new();
            if reader.read_line(&mut line).ok()? == 0 {
                break;
            }
            let line = line.trim_end();
            if line.is_empty() {
                break;
            }
            if let Some((name, value)) = line.split_once(':') {
                let value = value.trim();
                match name.to_ascii_lowercase().as_str() {
                    "content-length" => content_length = value.parse().ok()?,
                    "authorization" => authorization = Some(value.to_string()),
                    _ => {}
                }
            }
        }

        let mut body = vec![0u8; content_length];
        reader.read_exact(&mut body).ok()?;

        let (status, reply) = if fail_path == Some(path.as_str()) {
            (
                "403 Forbidden",
                r#"{"error":"etcdserver: permission denied","code":7,"message":"etcdserver: permission denied"}"#.to_string(),
            )
        } else if path.ends_with("/auth/authenticate") {
            ("200 OK", format!(r#"{{"token":"{}"}}"#, GatewayStub::TOKEN))
        } else if path.ends_with("/maintenance/status") {
            ("200 OK", r#"{"version":"3.5.9"}"#.to_string())
        } else {
            ("200 OK", r#"{"header":{"revision":"2"}}"#.to_string())
        };

        let mut stream = stream;
        write!(
            stream,
            "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{reply}",
            reply.len()
        )
        .ok()?;
        stream.flush().ok()?;

        Some(Recorded {
            path,
            body: String::from_utf8_lossy(&body).into_owned(),
            authorization,
        })
    }

    #[test]
    fn include_dir_writes_files() {
        let dir = IncludeDir::new(&[("a.crt", "A")]);
        assert_eq!(fs::read_to_string(dir.path().join("a.crt")).unwrap(), "A");
    }

    #[test]
    fn failing_sink_fails_only_on_its_key() {
        let mut sink = FailingSink::on("/bad");
        sink.put("/good", b"").unwrap();
        assert!(sink.put("/bad", b"").is_err());
        assert_eq!(sink.written, vec!["/good".to_string()]);
    }
}
