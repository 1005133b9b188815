//! Runtime values bound by the implicit runtime module
//!
//! [`launch`](crate::launch) binds the process arguments, the environment and
//! the string properties of the application as [`RuntimeArgs`],
//! [`RuntimeEnv`] and [`RuntimeProps`]. Entry points and factories request
//! them like any other dependency and read typed values from them.

use indexmap::IndexMap;
use std::ffi::OsString;

/// Errors raised while reading runtime values
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("Missing variable: {0}")]
	MissingVariable(String),

	#[error("Failed to parse variable '{key}' (value length: {value_len}): {error}")]
	ParseError {
		key: String,
		/// Length of the original value (stored instead of the raw value to prevent secret leakage)
		value_len: usize,
		error: String,
	},

	#[error("Invalid variable name '{name}': {reason}")]
	InvalidVariableName { name: String, reason: String },

	#[error("Invalid properties document: {0}")]
	Toml(#[from] toml::de::Error),
}

/// Parse a boolean the way configuration files spell it.
///
/// Accepts `true/false`, `yes/no`, `on/off` and `1/0`, case-insensitively.
pub fn parse_bool(value: &str) -> Result<bool, String> {
	match value.trim().to_lowercase().as_str() {
		"true" | "yes" | "on" | "1" => Ok(true),
		"false" | "no" | "off" | "0" => Ok(false),
		_ => Err("expected one of true/false, yes/no, on/off, 1/0".to_string()),
	}
}

/// Split a comma-separated value, trimming items and dropping empty ones.
pub fn parse_list(value: &str) -> Vec<String> {
	value
		.split(',')
		.map(str::trim)
		.filter(|item| !item.is_empty())
		.map(str::to_string)
		.collect()
}

/// Rejects names that are empty, contain control characters, or contain `=`.
fn validate_name(name: &str) -> Result<(), ConfigError> {
	let reason = if name.is_empty() {
		"name must not be empty".to_string()
	} else if let Some(pos) = name.find(|c: char| c.is_control()) {
		format!("name contains control character at position {}", pos)
	} else if name.contains('=') {
		"name must not contain '='".to_string()
	} else {
		return Ok(());
	};
	Err(ConfigError::InvalidVariableName {
		name: name.to_string(),
		reason,
	})
}

macro_rules! runtime_values {
	($(#[$meta:meta])* $name:ident) => {
		$(#[$meta])*
		#[derive(Debug, Clone, Default)]
		pub struct $name {
			prefix: Option<String>,
			values: IndexMap<String, String>,
		}

		impl $name {
			pub fn new<I, K, V>(values: I) -> Self
			where
				I: IntoIterator<Item = (K, V)>,
				K: Into<String>,
				V: Into<String>,
			{
				Self {
					prefix: None,
					values: values
						.into_iter()
						.map(|(k, v)| (k.into(), v.into()))
						.collect(),
				}
			}

			/// View of the same values with `prefix` prepended to every lookup.
			pub fn with_prefix(&self, prefix: impl Into<String>) -> Self {
				Self {
					prefix: Some(prefix.into()),
					values: self.values.clone(),
				}
			}

			fn full_key(&self, key: &str) -> String {
				match &self.prefix {
					Some(prefix) => format!("{}{}", prefix, key),
					None => key.to_string(),
				}
			}

			fn lookup(&self, key: &str) -> Result<(String, Option<&str>), ConfigError> {
				let full_key = self.full_key(key);
				validate_name(&full_key)?;
				let value = self.values.get(&full_key).map(String::as_str);
				Ok((full_key, value))
			}

			/// Raw value, `None` when absent.
			pub fn get(&self, key: &str) -> Option<&str> {
				self.values.get(&self.full_key(key)).map(String::as_str)
			}

			pub fn str(&self, key: &str) -> Result<String, ConfigError> {
				self.str_with_default(key, None)
			}

			pub fn str_with_default(
				&self,
				key: &str,
				default: Option<&str>,
			) -> Result<String, ConfigError> {
				match self.lookup(key)? {
					(_, Some(value)) => Ok(value.to_string()),
					(full_key, None) => default
						.map(str::to_string)
						.ok_or(ConfigError::MissingVariable(full_key)),
				}
			}

			pub fn bool(&self, key: &str) -> Result<bool, ConfigError> {
				self.bool_with_default(key, None)
			}

			pub fn bool_with_default(
				&self,
				key: &str,
				default: Option<bool>,
			) -> Result<bool, ConfigError> {
				match self.lookup(key)? {
					(full_key, Some(value)) => {
						parse_bool(value).map_err(|error| ConfigError::ParseError {
							key: full_key,
							value_len: value.len(),
							error,
						})
					}
					(full_key, None) => default.ok_or(ConfigError::MissingVariable(full_key)),
				}
			}

			pub fn int(&self, key: &str) -> Result<i64, ConfigError> {
				self.int_with_default(key, None)
			}

			pub fn int_with_default(
				&self,
				key: &str,
				default: Option<i64>,
			) -> Result<i64, ConfigError> {
				match self.lookup(key)? {
					(full_key, Some(value)) => {
						value.trim().parse::<i64>().map_err(|e| ConfigError::ParseError {
							key: full_key,
							value_len: value.len(),
							error: e.to_string(),
						})
					}
					(full_key, None) => default.ok_or(ConfigError::MissingVariable(full_key)),
				}
			}

			/// Comma-separated list
			pub fn list(&self, key: &str) -> Result<Vec<String>, ConfigError> {
				match self.lookup(key)? {
					(_, Some(value)) => Ok(parse_list(value)),
					(full_key, None) => Err(ConfigError::MissingVariable(full_key)),
				}
			}

			pub fn contains(&self, key: &str) -> bool {
				self.get(key).is_some()
			}

			pub fn len(&self) -> usize {
				self.values.len()
			}

			pub fn is_empty(&self) -> bool {
				self.values.is_empty()
			}

			/// Entries in insertion order, ignoring the prefix.
			pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
				self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
			}
		}
	};
}

runtime_values!(
	/// Environment variables of the application
	RuntimeEnv
);

runtime_values!(
	/// String properties of the application
	///
	/// Nested TOML tables are flattened into dotted keys.
	RuntimeProps
);

impl RuntimeEnv {
	/// Snapshot of the current process environment.
	///
	/// Entries whose name or value is not valid UTF-8 are skipped.
	pub fn from_process() -> Self {
		Self::from_os_vars(std::env::vars_os())
	}

	pub(crate) fn from_os_vars<I>(vars: I) -> Self
	where
		I: IntoIterator<Item = (OsString, OsString)>,
	{
		Self::new(vars.into_iter().filter_map(|(key, value)| {
			match (key.into_string(), value.into_string()) {
				(Ok(key), Ok(value)) => Some((key, value)),
				(key, _) => {
					tracing::debug!(
						name = %key.unwrap_or_else(|raw| raw.to_string_lossy().into_owned()),
						"Skipping non UTF-8 environment variable"
					);
					None
				}
			}
		}))
	}
}

impl RuntimeProps {
	/// Parse a TOML document into flattened properties.
	///
	/// ```
	/// use trellis_di::RuntimeProps;
	///
	/// let props = RuntimeProps::from_toml_str(
	///     "name = \"app\"\n[server]\nport = 8080\nhosts = [\"a\", \"b\"]\n",
	/// )
	/// .unwrap();
	///
	/// assert_eq!(props.str("name").unwrap(), "app");
	/// assert_eq!(props.int("server.port").unwrap(), 8080);
	/// assert_eq!(props.list("server.hosts").unwrap(), vec!["a", "b"]);
	/// ```
	pub fn from_toml_str(document: &str) -> Result<Self, ConfigError> {
		let table: toml::Table = toml::from_str(document)?;
		let mut values = IndexMap::new();
		flatten_toml("", &table, &mut values);
		Ok(Self {
			prefix: None,
			values,
		})
	}

	/// Merge `other` into these properties; its values win.
	pub fn merge(&mut self, other: RuntimeProps) {
		self.values.extend(other.values);
	}

	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.values.insert(key.into(), value.into());
	}
}

impl RuntimeEnv {
	pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
		self.values.insert(key.into(), value.into());
	}
}

fn flatten_toml(prefix: &str, table: &toml::Table, out: &mut IndexMap<String, String>) {
	for (key, value) in table {
		let full_key = if prefix.is_empty() {
			key.clone()
		} else {
			format!("{}.{}", prefix, key)
		};
		match value {
			toml::Value::Table(nested) => flatten_toml(&full_key, nested, out),
			other => {
				out.insert(full_key, scalar_to_string(other));
			}
		}
	}
}

fn scalar_to_string(value: &toml::Value) -> String {
	match value {
		toml::Value::String(s) => s.clone(),
		toml::Value::Array(items) => items
			.iter()
			.map(scalar_to_string)
			.collect::<Vec<_>>()
			.join(","),
		other => other.to_string(),
	}
}

/// Command-line arguments of the application
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeArgs {
	args: Vec<String>,
}

impl RuntimeArgs {
	pub fn new<I, S>(args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			args: args.into_iter().map(Into::into).collect(),
		}
	}

	/// Arguments of the current process, program name included.
	///
	/// Invalid UTF-8 sequences are replaced with U+FFFD.
	pub fn from_process() -> Self {
		Self::from_os_args(std::env::args_os())
	}

	pub(crate) fn from_os_args<I>(args: I) -> Self
	where
		I: IntoIterator<Item = OsString>,
	{
		Self::new(args.into_iter().map(|arg| arg.to_string_lossy().into_owned()))
	}

	pub fn as_slice(&self) -> &[String] {
		&self.args
	}

	pub fn get(&self, index: usize) -> Option<&str> {
		self.args.get(index).map(String::as_str)
	}

	pub fn iter(&self) -> impl Iterator<Item = &str> {
		self.args.iter().map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.args.len()
	}

	pub fn is_empty(&self) -> bool {
		self.args.is_empty()
	}

	/// Whether `--name` was passed.
	pub fn flag(&self, name: &str) -> bool {
		let flag = format!("--{}", name);
		self.args.iter().any(|arg| *arg == flag)
	}

	/// Value of `--name=value` or `--name value`.
	pub fn value(&self, name: &str) -> Option<&str> {
		let flag = format!("--{}", name);
		let inline = format!("{}=", flag);
		let mut iter = self.args.iter();
		while let Some(arg) = iter.next() {
			if let Some(value) = arg.strip_prefix(&inline) {
				return Some(value);
			}
			if *arg == flag {
				return iter.next().map(String::as_str);
			}
		}
		None
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("true", true)]
	#[case("YES", true)]
	#[case("on", true)]
	#[case("1", true)]
	#[case("False", false)]
	#[case("no", false)]
	#[case("off", false)]
	#[case("0", false)]
	fn parse_bool_accepts_common_spellings(#[case] input: &str, #[case] expected: bool) {
		assert_eq!(parse_bool(input).unwrap(), expected);
	}

	#[rstest]
	fn parse_list_trims_and_drops_empty() {
		assert_eq!(parse_list(" a, b ,,c "), vec!["a", "b", "c"]);
	}

	#[rstest]
	fn env_typed_accessors() {
		// Arrange
		let env = RuntimeEnv::new([("PORT", "8080"), ("DEBUG", "on"), ("HOSTS", "a,b")]);

		// Act & Assert
		assert_eq!(env.int("PORT").unwrap(), 8080);
		assert!(env.bool("DEBUG").unwrap());
		assert_eq!(env.list("HOSTS").unwrap(), vec!["a", "b"]);
		assert_eq!(env.int_with_default("WORKERS", Some(4)).unwrap(), 4);
	}

	#[rstest]
	fn parse_error_hides_value() {
		let env = RuntimeEnv::new([("PORT", "secret-value")]);

		let err = env.int("PORT").unwrap_err();

		assert!(matches!(err, ConfigError::ParseError { value_len: 12, .. }));
		assert!(!err.to_string().contains("secret-value"));
	}

	#[rstest]
	fn prefix_applies_to_lookups() {
		let env = RuntimeEnv::new([("APP_NAME", "trellis")]);

		let scoped = env.with_prefix("APP_");

		assert_eq!(scoped.str("NAME").unwrap(), "trellis");
		assert!(matches!(
			scoped.str("MISSING"),
			Err(ConfigError::MissingVariable(ref key)) if key == "APP_MISSING"
		));
	}

	#[rstest]
	fn invalid_name_is_rejected() {
		let env = RuntimeEnv::default();

		let result = env.str("A=B");

		assert!(matches!(result, Err(ConfigError::InvalidVariableName { .. })));
	}

	#[rstest]
	fn toml_props_flatten_nested_tables() {
		// Arrange
		let document = "[db]\nurl = \"postgres://localhost\"\npool = 5\n[db.tls]\nenabled = true\n";

		// Act
		let props = RuntimeProps::from_toml_str(document).unwrap();

		// Assert
		assert_eq!(props.str("db.url").unwrap(), "postgres://localhost");
		assert_eq!(props.int("db.pool").unwrap(), 5);
		assert!(props.bool("db.tls.enabled").unwrap());
	}

	#[rstest]
	fn invalid_toml_is_reported() {
		let result = RuntimeProps::from_toml_str("not = [valid");

		assert!(matches!(result, Err(ConfigError::Toml(_))));
	}

	#[rstest]
	fn args_flags_and_values() {
		let args = RuntimeArgs::new(["app", "--verbose", "--port=80", "--host", "example.org"]);

		assert!(args.flag("verbose"));
		assert!(!args.flag("quiet"));
		assert_eq!(args.value("port"), Some("80"));
		assert_eq!(args.value("host"), Some("example.org"));
		assert_eq!(args.value("missing"), None);
	}

	#[cfg(unix)]
	#[rstest]
	fn env_skips_non_utf8_entries() {
		use std::os::unix::ffi::OsStringExt;

		// Arrange
		let vars = vec![
			(OsString::from("APP_NAME"), OsString::from("trellis")),
			(OsString::from("APP_BLOB"), OsString::from_vec(vec![0xff, 0xfe])),
			(OsString::from_vec(vec![0xc3, 0x28]), OsString::from("value")),
		];

		// Act
		let env = RuntimeEnv::from_os_vars(vars);

		// Assert
		assert_eq!(env.len(), 1);
		assert_eq!(env.get("APP_NAME"), Some("trellis"));
		assert!(!env.contains("APP_BLOB"));
	}

	#[cfg(unix)]
	#[rstest]
	fn args_replace_invalid_utf8() {
		use std::os::unix::ffi::OsStringExt;

		let args = RuntimeArgs::from_os_args(vec![
			OsString::from("serve"),
			OsString::from_vec(vec![b'-', b'-', 0xff]),
		]);

		assert_eq!(args.len(), 2);
		assert_eq!(args.get(0), Some("serve"));
		assert_eq!(args.get(1), Some("--\u{FFFD}"));
	}

	#[cfg(unix)]
	#[rstest]
	fn from_process_tolerates_non_utf8_environment() {
		use std::os::unix::ffi::OsStrExt;

		// Arrange
		unsafe {
			std::env::set_var(
				"TRELLIS_RUNTIME_NON_UTF8",
				std::ffi::OsStr::from_bytes(&[0xff, 0xfe]),
			)
		};

		// Act
		let env = RuntimeEnv::from_process();
		let args = RuntimeArgs::from_process();
		unsafe { std::env::remove_var("TRELLIS_RUNTIME_NON_UTF8") };

		// Assert
		assert!(!env.contains("TRELLIS_RUNTIME_NON_UTF8"));
		assert!(!args.is_empty());
	}
}
