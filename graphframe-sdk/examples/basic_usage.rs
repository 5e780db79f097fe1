//! Builds read queries, write plans and schema statements and prints the
//! compiled Cypher without touching a database

use anyhow::Result;
use graphframe::testing::RecordingDriver;
use graphframe::*;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("graphframe=debug")),
        )
        .init();

    let driver = Arc::new(RecordingDriver::new());
    let graph = Graph::new(GraphConfig::default(), driver.clone());

    // Node query
    let adults = graph
        .nodes("Person")
        .where_([("age__gte", Value::from(18)), ("country", Value::from("US"))])
        .select(["name", "email"])
        .order_by(["age__desc"])
        .limit(10)
        .compile()?;
    println!("Node query:\n{}\nparams: {:?}\n", adults, adults.params());

    // Traversal, then back to the people
    let path = graph
        .nodes("Person")
        .traverse("WORKS_AT", "Company", Direction::Out)
        .where_([("to__industry", "Tech")]);
    println!("Traversal:\n{}\n", path.compile()?);

    let back = path.back().where_([("age__lt", 40)]).select(["name"]);
    println!("Back query:\n{}\n", back.compile()?);

    // Upsert
    let people = vec![
        record([
            ("email", Value::from("ann@example.com")),
            ("name", Value::from("Ann")),
            ("age", Value::from(31)),
        ]),
        record([
            ("email", Value::from("bob@example.com")),
            ("name", Value::from("Bob")),
            ("age", Value::Null),
        ]),
    ];
    let mut upsert = graph.nodes("Person").upsert(people, ["email"]);
    println!("Upsert:\n{}\n", upsert.preview()?);
    let stats = upsert.commit().await?;
    println!("Upsert stats: {:?}\n", stats);

    // Relationship upsert
    let jobs = vec![record([
        ("email", Value::from("ann@example.com")),
        ("company", Value::from("Acme")),
        ("role", Value::from("Engineer")),
    ])];
    let mut hire = graph.rels("WORKS_AT").upsert(
        jobs,
        Endpoint::new("Person", "email"),
        Endpoint::new("Company", "company"),
        Vec::<String>::new(),
    );
    println!("Relationship upsert:\n{}\n", hire.preview()?);

    // Field-level update
    let mut bump = graph
        .nodes("Person")
        .where_([("email", "ann@example.com")])
        .inc("logins", 1);
    println!("Increment:\n{}\n", bump.preview()?);

    // Schema
    let schema = graph.schema();
    for mut plan in [
        schema.ensure_unique("Person", "email"),
        schema.ensure_index("Person", "name"),
    ] {
        println!("Schema:\n{}\n", plan.compile()?);
        plan.commit().await?;
    }

    println!("Statements sent: {}", driver.calls().len());
    Ok(())
}
