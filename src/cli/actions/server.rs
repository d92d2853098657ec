use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::gardi;
use anyhow::Result;

/// Handle the server action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server { port } => {
            gardi::new(port, globals).await?;
        }
    }

    Ok(())
}
