use dpdrbot_core::PlanCatalog;

/// Strategy for printing the subscription tiers.
#[derive(Debug, Clone, Copy)]
pub struct PlansStrategy;

impl super::CommandStrategy for PlansStrategy {
    type Input = ();

    async fn execute(&self, _input: Self::Input) -> anyhow::Result<()> {
        println!(
            "{:<8} {:<22} {:>9} {:>11} {:>10}",
            "ID", "NAME", "MSGS/DAY", "TOKENS/DAY", "EUR/MONTH"
        );
        for plan in PlanCatalog::all() {
            println!(
                "{:<8} {:<22} {:>9} {:>11} {:>10.2}",
                plan.id.as_str(),
                plan.name,
                plan.daily_message_limit,
                plan.daily_token_limit,
                plan.price
            );
        }
        Ok(())
    }
}
