use super::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "sessionkeeper", about = "Authenticated API session tool")]
pub struct Cli {
    #[arg(long)]
    pub settings: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show the stored session.
    Status,
    /// Seed the session with credentials obtained from a login.
    Login {
        #[arg(long)]
        access_token: String,
        #[arg(long)]
        refresh_token: String,
        #[arg(long)]
        subject: String,
    },
    /// Forget the stored session.
    Logout,
    /// Send one authenticated request and print the response body.
    Request {
        method: String,
        path: String,
        #[arg(long)]
        body: Option<String>,
        /// Query parameter as `key=value`; repeatable.
        #[arg(long = "query", value_parser = parse_query)]
        query: Vec<(String, String)>,
        /// Extra header as `name:value`; repeatable.
        #[arg(long = "header", value_parser = parse_header)]
        header: Vec<(String, String)>,
    },
}

fn parse_query(s: &str) -> Result<(String, String), String> {
    split_pair(s, '=').ok_or_else(|| format!("expected key=value, got `{}`", s))
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    split_pair(s, ':').ok_or_else(|| format!("expected name:value, got `{}`", s))
}

fn split_pair(s: &str, separator: char) -> Option<(String, String)> {
    let (key, value) = s.split_once(separator)?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    Some((key.to_string(), value.trim().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_accepts_repeated_query_and_header() {
        let cli = Cli::try_parse_from([
            "sessionkeeper",
            "request",
            "get",
            "/clients",
            "--query",
            "page=2",
            "--query",
            "filter=a=b",
            "--header",
            "X-Workspace: acme",
        ])
        .unwrap();
        let Command::Request { query, header, .. } = cli.command else {
            panic!("expected request command");
        };
        assert_eq!(
            query,
            vec![
                ("page".to_string(), "2".to_string()),
                ("filter".to_string(), "a=b".to_string())
            ]
        );
        assert_eq!(header, vec![("X-Workspace".to_string(), "acme".to_string())]);
    }

    #[test]
    fn malformed_query_is_rejected() {
        assert!(parse_query("page").is_err());
        assert!(parse_header(":value").is_err());
    }
}
