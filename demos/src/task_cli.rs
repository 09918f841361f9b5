use clap::{Arg, Command};
use dotenv::dotenv;
use std::sync::Arc;
use taskboard::prelude::*;

/// Prints notices to the terminal as they arrive
struct PrintNoticeSink;

impl NoticeSink for PrintNoticeSink {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Error => eprintln!("error: {}", notice.message),
            _ => println!("{}", notice.message),
        }
    }
}

fn cli() -> Command<'static> {
    Command::new("task_cli")
        .version("0.1.0")
        .about("Manage your Taskboard tasks from the terminal")
        .arg(
            Arg::new("session")
                .long("session")
                .value_name("FILE")
                .help("Where the signed-in session is kept")
                .takes_value(true),
        )
        .subcommand_required(true)
        .subcommand(
            Command::new("login")
                .about("Sign in with email and password")
                .arg(Arg::new("email").required(true))
                .arg(Arg::new("password").required(true)),
        )
        .subcommand(
            Command::new("signup")
                .about("Create an account and sign in")
                .arg(Arg::new("username").required(true))
                .arg(Arg::new("email").required(true))
                .arg(Arg::new("password").required(true)),
        )
        .subcommand(Command::new("logout").about("Forget the stored session"))
        .subcommand(
            Command::new("list").about("List your tasks").arg(
                Arg::new("filter")
                    .short('f')
                    .long("filter")
                    .value_name("STATUS")
                    .help("all, pending, in-progress or completed")
                    .takes_value(true)
                    .default_value("all"),
            ),
        )
        .subcommand(
            Command::new("add")
                .about("Create a task")
                .arg(Arg::new("title").required(true))
                .arg(Arg::new("description").required(true)),
        )
        .subcommand(
            Command::new("status")
                .about("Move a task to another status")
                .arg(Arg::new("id").required(true))
                .arg(Arg::new("status").required(true)),
        )
        .subcommand(
            Command::new("done")
                .about("Mark a task completed")
                .arg(Arg::new("id").required(true)),
        )
        .subcommand(
            Command::new("rm")
                .about("Delete a task")
                .arg(Arg::new("id").required(true)),
        )
}

fn arg<'a>(matches: &'a clap::ArgMatches, name: &str) -> &'a str {
    matches.value_of(name).unwrap_or_default()
}

#[tokio::main]
async fn main() {
    dotenv().ok();
    pretty_env_logger::init();

    if let Err(e) = run().await {
        // API failures were already printed by the notice sink
        if !matches!(e.downcast_ref::<Error>(), Some(Error::Api { .. })) {
            eprintln!("error: {}", e);
        }
        std::process::exit(1);
    }
}

async fn run() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let matches = cli().get_matches();

    let mut options = ClientOptions::from_env()?;
    if let Some(path) = matches.value_of("session") {
        options = options.with_session_path(path);
    } else if options.session_path.is_none() {
        options = options.with_session_path(".taskboard-session.json");
    }

    let routes = RouteState::default();
    let client = Taskboard::new(options, Arc::new(PrintNoticeSink), Arc::new(routes.clone()))?;
    let state = client.session().bootstrap();
    log::debug!("bootstrapped into {:?}", state);

    match matches.subcommand() {
        Some(("login", sub)) => {
            let user = client
                .session()
                .sign_in(arg(sub, "email"), arg(sub, "password"))
                .await?;
            println!("Signed in as {} <{}>", user.username, user.email);
        }
        Some(("signup", sub)) => {
            let user = client
                .session()
                .sign_up(arg(sub, "username"), arg(sub, "email"), arg(sub, "password"))
                .await?;
            println!("Welcome, {}", user.username);
        }
        Some(("logout", _)) => {
            client.session().sign_out();
            client.tasks().clear();
            println!("Signed out");
        }
        Some((command, sub)) => {
            if !client.session().is_authenticated() {
                return Err("not signed in, run `task_cli login` first".into());
            }
            let tasks = client.tasks();
            tasks.fetch_all().await?;

            match command {
                "list" => {
                    let filter: TaskFilter = arg(sub, "filter").parse()?;
                    for task in tasks.filtered(filter) {
                        println!("{:<26} {:<12} {}", task.id, task.status, task.title);
                    }
                    let counts = tasks.counts();
                    println!(
                        "\n{} tasks: {} pending, {} in progress, {} completed",
                        counts.total(),
                        counts.pending,
                        counts.in_progress,
                        counts.completed
                    );
                }
                "add" => {
                    let task = tasks
                        .create(arg(sub, "title"), arg(sub, "description"))
                        .await?;
                    println!("{}", task.id);
                }
                "status" => {
                    let status: TaskStatus = arg(sub, "status").parse()?;
                    tasks.set_status(arg(sub, "id"), status).await?;
                }
                "done" => {
                    tasks
                        .set_status(arg(sub, "id"), TaskStatus::Completed)
                        .await?;
                }
                "rm" => tasks.delete(arg(sub, "id")).await?,
                other => return Err(format!("unknown command: {}", other).into()),
            }
        }
        None => return Err("a command is required".into()),
    }

    if routes.current() == Route::Login && !client.session().is_authenticated() {
        log::info!("session ended, sign in again to continue");
    }

    Ok(())
}
