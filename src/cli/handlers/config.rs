//! Handler for the `config` command

use crate::cli::{ConfigCommands, OutputFormatter};
use crate::config::Config;
use crate::error::Result;

/// Handler for `config` subcommands
pub fn handle_config_command(
    command: &ConfigCommands,
    config: &Config,
    output: &OutputFormatter,
) -> Result<()> {
    match command {
        ConfigCommands::Show => handle_config_show(config, output),
    }
}

/// Print the effective configuration with bearer tokens masked
fn handle_config_show(config: &Config, output: &OutputFormatter) -> Result<()> {
    let masked = masked(config);
    if output.is_json() {
        output.print_json(&masked)
    } else {
        output.info(&serde_yaml::to_string(&masked)?);
        Ok(())
    }
}

fn masked(config: &Config) -> Config {
    let mut masked = config.clone();
    for grant in &mut masked.auth.tokens {
        grant.token = mask_token(&grant.token);
    }
    masked
}

fn mask_token(token: &str) -> String {
    let visible: String = token.chars().take(2).collect();
    format!("{visible}***")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenGrant;
    use crate::core::Role;

    #[test]
    fn test_tokens_are_masked() {
        let mut config = Config::default();
        config
            .auth
            .tokens
            .push(TokenGrant::new("s3cret-token", "bob", Role::Handler));

        let shown = masked(&config);
        assert_eq!(shown.auth.tokens[0].token, "s3***");
        assert_eq!(shown.auth.tokens[0].actor, "bob");
        assert_eq!(config.auth.tokens[0].token, "s3cret-token");
        assert_eq!(shown.server, config.server);
    }
}
