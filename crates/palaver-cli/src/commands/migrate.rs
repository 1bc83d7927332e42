use anyhow::Result;
use palaver_application::ChatService;

pub fn run(service: &ChatService, owner: &str) -> Result<()> {
    let report = service.migrate(owner)?;
    println!("{report}");
    Ok(())
}
