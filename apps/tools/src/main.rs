use admin_client::AdminClient;
use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use server_api::{ApiContext, SessionKeys};
use shared::{
    domain::StaffStatus,
    error::ApiException,
    paging::PageRequest,
    protocol::{RegisterForm, RequestPanelQuery, CHECKBOX_ON},
};
use storage::Storage;
use tracing_subscriber::EnvFilter;

mod seed;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, default_value = "sqlite://./data/hoa.db")]
    database_url: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the database if needed and apply migrations.
    Migrate,
    /// Fill the database with sample houses, people and requests.
    Seed {
        #[arg(long, default_value_t = 200)]
        houses: u32,
        #[arg(long, default_value_t = 500)]
        residents: u32,
        #[arg(long, default_value_t = 150)]
        staff: u32,
        #[arg(long, default_value_t = 1000)]
        requests: u32,
        #[arg(long, default_value = "Password123")]
        password: String,
    },
    CreateHouse {
        address: String,
    },
    CreateSpecialization {
        title: String,
    },
    /// Create an account with a resident and/or staff record.
    RegisterUser {
        phone: String,
        password: String,
        full_name: String,
        #[arg(long)]
        resident: bool,
        #[arg(long)]
        staff: bool,
    },
    SetStaffStatus {
        phone: String,
        /// One of `работает`, `уволился`, `недоступен`.
        status: String,
    },
    /// Query a running server as a staff member.
    Remote {
        #[arg(long, default_value = "http://127.0.0.1:8000")]
        server_url: String,
        #[arg(long)]
        phone: String,
        #[arg(long)]
        password: String,
        #[command(subcommand)]
        action: RemoteAction,
    },
}

#[derive(Subcommand, Debug)]
enum RemoteAction {
    Houses {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 10)]
        limit: u32,
        #[arg(long, default_value = "")]
        pattern: String,
    },
    Requests {
        #[arg(long, default_value_t = 1)]
        page: u32,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        sort: Option<String>,
    },
    DeleteRequest {
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    match cli.command {
        Command::Remote {
            server_url,
            phone,
            password,
            action,
        } => remote(&server_url, &phone, &password, action).await,
        command => local(&cli.database_url, command).await,
    }
}

async fn local(database_url: &str, command: Command) -> Result<()> {
    let storage = Storage::new(database_url).await?;
    match command {
        Command::Migrate => println!("migrations applied to {database_url}"),
        Command::Seed {
            houses,
            residents,
            staff,
            requests,
            password,
        } => {
            let plan = seed::SeedPlan {
                houses,
                residents,
                staff,
                requests,
                password,
            };
            let summary = seed::seed(&storage, &plan, &mut rand::rng()).await?;
            println!("{summary:?}");
        }
        Command::CreateHouse { address } => match storage.create_house(&address).await? {
            Some(house) => println!("created house_id={}", house.id),
            None => bail!("house already exists: {address}"),
        },
        Command::CreateSpecialization { title } => {
            let specialization = storage.create_specialization(&title).await?;
            println!("created specialization_id={}", specialization.id);
        }
        Command::RegisterUser {
            phone,
            password,
            full_name,
            resident,
            staff,
        } => {
            let api = ApiContext {
                storage,
                sessions: SessionKeys::new(b"tools", 60),
            };
            let checkbox = |on: bool| if on { CHECKBOX_ON.to_string() } else { String::new() };
            let form = RegisterForm {
                phone_number: phone,
                password,
                full_name,
                is_resident: checkbox(resident),
                is_staff_member: checkbox(staff),
            };
            let response = server_api::register(&api, &form)
                .await
                .map_err(ApiException::from)?;
            match response.error {
                Some(error) => println!("registered {} with errors:\n{error}", response.message),
                None => println!("registered {}", response.message),
            }
        }
        Command::SetStaffStatus { phone, status } => {
            let status = status.parse::<StaffStatus>()?;
            let Some(member) = storage.staff_member_by_phone(&phone).await? else {
                bail!("no staff member with phone {phone}");
            };
            storage.set_staff_status(member.id, status).await?;
            println!("staff_member_id={} status={status}", member.id);
        }
        Command::Remote { .. } => bail!("remote commands do not open the database"),
    }

    Ok(())
}

async fn remote(server_url: &str, phone: &str, password: &str, action: RemoteAction) -> Result<()> {
    let client = AdminClient::new(server_url)?;
    client.login(phone, password).await?;

    match action {
        RemoteAction::Houses { page, limit, pattern } => {
            let listing = client.list_houses(PageRequest { page, limit }, &pattern).await?;
            for house in &listing.items {
                println!("{}\t{}", house.id, house.address);
            }
            println!(
                "page {} of {} ({} total)",
                listing.page.unwrap_or(page),
                listing.pages.unwrap_or(1),
                listing.total.unwrap_or_default()
            );
        }
        RemoteAction::Requests {
            page,
            limit,
            status,
            sort,
        } => {
            let filter = RequestPanelQuery {
                status,
                sort,
                ..RequestPanelQuery::default()
            };
            let listing = client.request_panel(PageRequest { page, limit }, &filter).await?;
            for request in &listing.items {
                println!(
                    "{}\t{}\t{}\t{}",
                    request.id, request.status, request.request_type, request.complaint
                );
            }
            println!("{} total", listing.total.unwrap_or_default());
        }
        RemoteAction::DeleteRequest { id } => {
            let response = client.delete_request(&id).await?;
            println!("{}", response.message);
        }
    }

    client.logout().await?;
    Ok(())
}
