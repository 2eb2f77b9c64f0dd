use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "gateway-cli")]
#[command(about = "Token client for the security gateway", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// Base URI of the token service.
    #[arg(long, default_value = "/tokens")]
    service_uri: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate with a password and print the issued token
    Login {
        #[arg(long)]
        user: String,
        #[arg(long)]
        password: String,
    },
    /// Invalidate the user's token
    Logout {
        #[arg(long)]
        user: String,
        #[arg(long)]
        token: String,
    },
    /// Check whether a token is still accepted
    Check {
        #[arg(long)]
        user: String,
        #[arg(long)]
        token: String,
    },
}

impl Cli {
    fn token_url(&self, user: &str) -> String {
        format!(
            "{}{}/{}",
            self.url.trim_end_matches('/'),
            self.service_uri,
            urlencoding::encode(user)
        )
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();

    match &cli.command {
        Commands::Login { user, password } => {
            let res = client
                .get(cli.token_url(user))
                .basic_auth(user, Some(password))
                .header("No-Auth-Challenge", "true")
                .send()
                .await?;
            print_response(res).await?;
        }
        Commands::Logout { user, token } => {
            let res = client
                .delete(cli.token_url(user))
                .bearer_auth(token)
                .send()
                .await?;
            let status = res.status();
            if status.is_success() {
                println!("Logged out {}", user);
            } else {
                eprintln!("Error: token service returned status {}", status);
            }
        }
        Commands::Check { user, token } => {
            let res = client
                .get(cli.token_url(user))
                .bearer_auth(token)
                .header("No-Auth-Challenge", "true")
                .send()
                .await?;
            let status = res.status();
            println!("{} {}", status.as_u16(), if status.is_success() { "valid" } else { "rejected" });
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: token service returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(());
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
