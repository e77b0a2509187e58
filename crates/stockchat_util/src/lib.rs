#![forbid(unsafe_code)]

pub mod endpoint {
	/// Parsed `http(s)://host[:port][/path]` server endpoint.
	#[derive(Debug, Clone, PartialEq, Eq, Hash)]
	pub struct ServerEndpoint {
		pub secure: bool,
		pub host: String,
		pub port: Option<u16>,
		pub path: String,
	}

	impl ServerEndpoint {
		/// Returns `host[:port]` (host preserved, IPv6 stays bracketed).
		pub fn hostport(&self) -> String {
			match self.port {
				Some(port) => format!("{}:{}", self.host, port),
				None => self.host.clone(),
			}
		}

		/// Base URL for REST calls, path included, without a trailing slash.
		pub fn http_base(&self) -> String {
			let scheme = if self.secure { "https" } else { "http" };
			format!("{scheme}://{}{}", self.hostport(), self.path.trim_end_matches('/'))
		}

		/// Base URL for the realtime transport: same host, `ws`/`wss` scheme, no path.
		pub fn ws_base(&self) -> String {
			let scheme = if self.secure { "wss" } else { "ws" };
			format!("{scheme}://{}", self.hostport())
		}

		/// Parse an endpoint string in the form `http(s)://host[:port][/path]`.
		///
		/// `ws://` and `wss://` are accepted as aliases of `http://` and `https://`.
		pub fn parse(s: &str) -> Result<Self, String> {
			let s = s.trim();
			if s.is_empty() {
				return Err("endpoint must be non-empty (expected http(s)://host[:port])".to_string());
			}

			let (secure, rest) = if let Some(rest) = s.strip_prefix("https://") {
				(true, rest)
			} else if let Some(rest) = s.strip_prefix("http://") {
				(false, rest)
			} else if let Some(rest) = s.strip_prefix("wss://") {
				(true, rest)
			} else if let Some(rest) = s.strip_prefix("ws://") {
				(false, rest)
			} else {
				return Err(format!("invalid endpoint (expected http(s)://host[:port]): {s}"));
			};

			if rest.contains('?') || rest.contains('#') {
				return Err(format!("invalid endpoint (query/fragment not allowed): {s}"));
			}

			let (authority, path) = match rest.find('/') {
				Some(idx) => (&rest[..idx], &rest[idx..]),
				None => (rest, ""),
			};

			let (host, port) = split_host_port(authority).map_err(|e| format!("{e}: {s}"))?;

			Ok(Self {
				secure,
				host,
				port,
				path: path.trim_end_matches('/').to_string(),
			})
		}
	}

	fn split_host_port(authority: &str) -> Result<(String, Option<u16>), String> {
		let authority = authority.trim();
		if authority.is_empty() {
			return Err("invalid endpoint host".to_string());
		}

		if authority.starts_with('[') {
			let close = authority
				.find(']')
				.ok_or_else(|| "invalid endpoint host (unterminated IPv6 literal)".to_string())?;
			let host = &authority[..=close];
			let rest = &authority[close + 1..];
			if rest.is_empty() {
				return Ok((host.to_string(), None));
			}
			let port_str = rest
				.strip_prefix(':')
				.ok_or_else(|| "invalid endpoint host (garbage after IPv6 literal)".to_string())?;
			return Ok((host.to_string(), Some(parse_port(port_str)?)));
		}

		match authority.rsplit_once(':') {
			Some((host, port_str)) => {
				if host.contains(':') {
					return Err("invalid endpoint host (IPv6 must be bracketed like http://[::1]:8000)".to_string());
				}
				if host.trim().is_empty() {
					return Err("invalid endpoint host".to_string());
				}
				Ok((host.to_string(), Some(parse_port(port_str)?)))
			}
			None => Ok((authority.to_string(), None)),
		}
	}

	fn parse_port(s: &str) -> Result<u16, String> {
		let port: u16 = s
			.trim()
			.parse()
			.map_err(|_| "invalid endpoint port (expected 1..=65535)".to_string())?;
		if port == 0 {
			return Err("invalid endpoint port (expected 1..=65535)".to_string());
		}
		Ok(port)
	}

	/// Validate `http(s)://host[:port][/path]`.
	pub fn validate_endpoint(s: &str) -> Result<(), String> {
		let _ = ServerEndpoint::parse(s)?;
		Ok(())
	}

}
