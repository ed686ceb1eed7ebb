use clap::{Arg, ArgMatches, Command};

pub const ARG_DIRECTORY_URL: &str = "directory-url";
pub const ARG_DIRECTORY_TIMEOUT_SECONDS: &str = "directory-timeout-seconds";

#[derive(Debug)]
pub struct Options {
    pub url: String,
    pub timeout_seconds: u64,
}

impl Options {
    /// Parse Identity Directory arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the directory URL is missing or empty.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let url = matches
            .get_one::<String>(ARG_DIRECTORY_URL)
            .cloned()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_DIRECTORY_URL}"))?;

        Ok(Self {
            url,
            timeout_seconds: matches
                .get_one::<u64>(ARG_DIRECTORY_TIMEOUT_SECONDS)
                .copied()
                .unwrap_or(5),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DIRECTORY_URL)
                .long(ARG_DIRECTORY_URL)
                .help("Identity Directory base URL, example: http://user-service:8080")
                .env("AUTH_SERVICE_DIRECTORY_URL")
                .required(true),
        )
        .arg(
            Arg::new(ARG_DIRECTORY_TIMEOUT_SECONDS)
                .long(ARG_DIRECTORY_TIMEOUT_SECONDS)
                .help("Timeout for each Identity Directory request in seconds")
                .env("AUTH_SERVICE_DIRECTORY_TIMEOUT_SECONDS")
                .default_value("5")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
}
