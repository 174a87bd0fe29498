use once_cell::sync::OnceCell;
use tvrt_contracts::DEFAULT_MAX_ARRAY_BITS;

// the host never allocates a larger array part
const MAX_ARRAY_BITS_CEILING: u32 = tvrt_host::MAX_ARRAY_BITS;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Array parts never grow past `2^max_array_bits` slots.
    pub max_array_bits: u32,
    /// When off, field lookups always walk the bucket chain.
    pub inline_cache: bool,
    /// Write slow-path events to stderr.
    pub trace: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            max_array_bits: DEFAULT_MAX_ARRAY_BITS,
            inline_cache: true,
            trace: false,
        }
    }
}

static CONFIG: OnceCell<RuntimeConfig> = OnceCell::new();

fn parse_bool(v: Option<String>, default: bool) -> bool {
    v.and_then(|v| match v.as_str() {
        "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
        "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
        _ => None,
    })
    .unwrap_or(default)
}

fn parse_u32_nonzero(v: Option<String>, default: u32) -> u32 {
    v.and_then(|v| v.trim().parse::<u32>().ok())
        .filter(|&v| v != 0)
        .unwrap_or(default)
}

impl RuntimeConfig {
    pub fn from_env() -> RuntimeConfig {
        RuntimeConfig::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RuntimeConfig {
        let max_array_bits = parse_u32_nonzero(
            lookup("TVRT_MAX_ARRAY_BITS"),
            DEFAULT_MAX_ARRAY_BITS,
        )
        .min(MAX_ARRAY_BITS_CEILING);
        RuntimeConfig {
            max_array_bits,
            inline_cache: parse_bool(lookup("TVRT_INLINE_CACHE"), true),
            trace: parse_bool(lookup("TVRT_TRACE"), false),
        }
    }

    pub fn max_array_size(&self) -> u64 {
        1u64 << self.max_array_bits
    }
}

/// Process-wide configuration, read from the environment on first use.
pub fn config() -> &'static RuntimeConfig {
    CONFIG.get_or_init(RuntimeConfig::from_env)
}
