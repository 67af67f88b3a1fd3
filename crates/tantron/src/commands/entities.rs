//! Entity listing.

use tabled::Tabled;
use tantron_core::{Entity, EntitySummary, Hub};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output::{self, or_dash};

#[derive(Tabled)]
pub(crate) struct EntityRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Available")]
    available: String,
    #[tabled(rename = "State")]
    state: String,
}

impl From<&EntitySummary> for EntityRow {
    fn from(e: &EntitySummary) -> Self {
        Self {
            id: e.unique_id.clone(),
            kind: e.kind.clone(),
            name: e.name.clone().unwrap_or_default(),
            available: if e.available { "yes" } else { "no" }.into(),
            state: or_dash(e.state.as_deref()),
        }
    }
}

pub(crate) fn render(summaries: &[EntitySummary], global: &GlobalOpts) -> Result<String, CliError> {
    output::render_list(
        &global.output,
        summaries,
        |e| EntityRow::from(e),
        |e| e.unique_id.clone(),
    )
}

pub async fn handle(hub: &Hub, global: &GlobalOpts) -> Result<(), CliError> {
    hub.refresh().await?;
    let summaries: Vec<EntitySummary> = hub.entities().iter().map(Entity::summary).collect();
    output::print_output(&render(&summaries, global)?, global.quiet);
    Ok(())
}
