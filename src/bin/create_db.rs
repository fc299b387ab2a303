use matchday_server::persistence::{
    self,
    singles::{SingleRepository, SqliteSingleRepository},
    teams::{SqliteTeamRepository, TeamRepository},
};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

const DEMO_TEAMS: [&str; 3] = ["Sparta", "Spartak", "Dukla"];

const DEMO_TEAM_SIZE: usize = 11;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let db_path = std::env::var("MATCHDAY_DB").expect("MATCHDAY_DB env var not set");
    let parent = std::path::Path::new(&db_path)
        .parent()
        .expect("Failed to get parent directory of DB path");
    if !parent.as_os_str().is_empty() && !parent.exists() {
        std::fs::create_dir_all(parent).expect("Failed to create parent directory for DB");
        println!("Created parent directory for DB at {}", parent.display());
    }

    if std::path::Path::new(&db_path).exists() {
        std::fs::remove_file(&db_path).expect("Failed to remove existing DB");
        println!("Removed existing DB at {}", db_path);
    }

    let conn_options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true)
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(conn_options)
        .await
        .expect("Failed to open DB");

    persistence::init_schema(&pool)
        .await
        .expect("Failed to create tables");
    println!("Created new DB at {}", db_path);

    persistence::seed_event_types(&pool)
        .await
        .expect("Failed to seed event types");
    println!("Event types created");

    let team_repository = SqliteTeamRepository::new(pool.clone());
    let single_repository = SqliteSingleRepository::new(pool);

    for (index, team_name) in DEMO_TEAMS.iter().enumerate() {
        let team = team_repository
            .create_team(team_name)
            .await
            .expect("Failed to create team");
        for member in 1..=DEMO_TEAM_SIZE {
            let person_number = index * DEMO_TEAM_SIZE + member;
            let person = single_repository
                .create_person(&person_number.to_string())
                .await
                .expect("Failed to create person");
            team_repository
                .add_member(team.id, person.id)
                .await
                .expect("Failed to add team member");
        }
        println!("Created team {} with {} members", team_name, DEMO_TEAM_SIZE);
    }
}
