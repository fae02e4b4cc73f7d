/// Default values shared by the config types.
pub mod defaults {
    /// Executable name of the wrapped framework CLI.
    pub const TOOL_BINARY: &str = "webforge";
    /// Package the on-demand runner fetches when no install is found.
    pub const TOOL_PACKAGE: &str = "@webforge/cli";
    /// On-demand package runner.
    pub const RUNNER: &str = "npx";
    /// Dependency bin directory, relative to the workspace root.
    pub const LOCAL_BIN_DIR: &str = "node_modules/.bin";
    /// Flag appended to commands whose stdout is parsed as JSON.
    pub const JSON_FLAG: &str = "--json";

    pub const CACHE_TTL_SECONDS: u64 = 60;
    pub const PROBE_TIMEOUT_SECONDS: u64 = 15;

    pub const GENERATE_TIMEOUT_SECONDS: u64 = 60;
    pub const ANALYZE_TIMEOUT_SECONDS: u64 = 120;
    pub const DOCTOR_TIMEOUT_SECONDS: u64 = 60;
    pub const KILL_GRACE_PERIOD_MS: u64 = 5_000;

    /// Package managers and runtime needed to run the tool.
    pub const SUPPORT_COMMANDS: &[&str] = &["npx", "npm", "pnpm", "yarn", "node"];

    /// Subcommands recognised in `--help` output.
    pub const KNOWN_FEATURES: &[&str] = &[
        "generate", "analyze", "doctor", "add", "build", "dev", "init", "new", "info", "routes",
        "upgrade",
    ];

    /// Feature set assumed when help output cannot be parsed.
    pub const FALLBACK_FEATURES: &[&str] = &["generate", "analyze", "doctor"];

    pub const CONFIG_FILE_NAME: &str = "toolbridge.toml";
}

/// Environment variables read by the loader.
pub mod env {
    pub const CONFIG_PATH: &str = "TOOLBRIDGE_CONFIG_PATH";
}
