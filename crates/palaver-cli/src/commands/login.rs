use anyhow::Result;
use palaver_application::ChatService;

pub fn run(service: &ChatService, email: &str, name: Option<&str>, avatar: Option<&str>) -> Result<()> {
    let user = service.sign_in(email, name, avatar)?;
    println!("Signed in as {} <{}>", user.display_name(), user.email);
    Ok(())
}
