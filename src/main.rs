use deskpet::app::PetApp;
use deskpet::config::Settings;
use deskpet::error::PetError;
use tracing::Level;

fn init_logging() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();
}

#[tokio::main]
async fn main() -> Result<(), PetError> {
    init_logging();
    let settings = Settings::load()?;
    PetApp::start_gui(&settings)
}
