use dpdrbot_config::Config;

/// Strategy for initializing the configuration.
///
/// Creates the template configuration file at `~/dpdrbot/config.json`.
#[derive(Debug, Clone, Copy)]
pub struct InitStrategy;

impl super::CommandStrategy for InitStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        let path = Config::create_config()?;
        println!("Config written to {}", path.display());
        println!("Fill in the bot token, API key and assistant id, or set BOT_TOKEN, OPENAI_API_KEY and ASSISTANT_ID.");
        Ok(())
    }
}
