//! Seeds the sample organizational graph the example queries run against:
//! employees assigned to teams, buildings in regions, and incidents that
//! occur in those regions.
//!
//! Connection settings come from `NEO4J_URI`, `NEO4J_USER`, and
//! `NEO4J_PASSWORD`, defaulting to a local instance. Existing sample
//! nodes are removed before loading, so the tool can be re-run.

use std::env;

use anyhow::Context;
use neo4rs::{ConfigBuilder, Graph, Query};
use tracing::info;
use tracing_subscriber::EnvFilter;

// (id, name, gender, email)
const EMPLOYEES: &[(&str, &str, &str, &str)] = &[
    ("daniel", "Daniel", "Male", "sylvainniles@microsoft.com"),
    ("sylvain", "Sylvain", "Male", "danielgerlag@microsoft.com"),
    ("allen", "Allen", "Male", "alljones@microsoft.com"),
    ("ryan", "Ryan", "Male", "alljones@microsoft.com"),
    ("nicole", "Nicole", "Female", "alljones@microsoft.com"),
    ("donovan", "Donovan", "Male", "alljones@microsoft.com"),
    ("mark", "Mark", "Male", "alljones@microsoft.com"),
    ("greg", "Greg", "Male", "alljones@microsoft.com"),
    ("swati", "Swati", "Female", "alljones@microsoft.com"),
    ("lili", "Lili", "Female", "alljones@microsoft.com"),
    ("alice", "Alice", "Female", "alljones@microsoft.com"),
    ("bob", "Bob", "male", "alljones@microsoft.com"),
    ("charlie", "Charlie", "male", "alljones@microsoft.com"),
];

const TEAMS: &[(&str, &str)] = &[
    ("testteama", "Test Team A"),
    ("testteamb", "Test Team B"),
    ("testteamc", "Test Team C"),
    ("azinc", "Azure Incubations"),
    ("fuse", "Fuse Labs"),
    ("aocto", "Azure Office of CTO"),
];

const BUILDINGS: &[(&str, &str)] = &[
    ("daniels_house", "Daniels House"),
    ("sylvains_house", "Sylvains House"),
    ("allens_house", "Allens House"),
    ("ryans_house", "Ryans House"),
    ("nicoles_house", "Nicoles House"),
    ("donovans_house", "Donovans House"),
    ("marks_house", "Marks House"),
    ("city_center", "City Center"),
    ("building_20", "Building 20"),
    ("building_99", "Building 99"),
    ("alices_house", "Alices House"),
    ("bobs_house", "Bobs House"),
    ("charlies_house", "Charlies House"),
];

const REGIONS: &[(&str, &str)] = &[
    ("canada", "Canada"),
    ("redmond", "Redmond"),
    ("socal", "Southern California"),
    ("houston", "Houston"),
];

// (id, name, description, severity)
const INCIDENTS: &[(&str, &str, &str, &str)] = &[
    ("famine", "Famine", "A big famine", "high"),
    ("flood", "Flood", "A big flood", "high"),
    ("storm", "Storm", "A big storm", "high"),
    ("fire", "Fire", "A big fire", "high"),
];

// Employee -> Team
const ASSIGNMENTS: &[(&str, &str)] = &[
    ("daniel", "azinc"),
    ("sylvain", "azinc"),
    ("allen", "azinc"),
    ("ryan", "azinc"),
    ("nicole", "azinc"),
    ("donovan", "azinc"),
    ("mark", "aocto"),
    ("greg", "fuse"),
    ("swati", "fuse"),
    ("lili", "fuse"),
    ("alice", "testteama"),
    ("bob", "testteamb"),
    ("charlie", "testteamc"),
];

// Employee -> Team
const MANAGERS: &[(&str, &str)] = &[
    ("ryan", "azinc"),
    ("lili", "fuse"),
    ("allen", "testteama"),
    ("sylvain", "testteamb"),
    ("daniel", "testteamc"),
];

// Employee -> Building
const EMPLOYEE_LOCATIONS: &[(&str, &str)] = &[
    ("daniel", "daniels_house"),
    ("sylvain", "sylvains_house"),
    ("allen", "allens_house"),
    ("ryan", "ryans_house"),
    ("nicole", "nicoles_house"),
    ("donovan", "donovans_house"),
    ("mark", "marks_house"),
    ("greg", "city_center"),
    ("swati", "building_20"),
    ("lili", "building_99"),
    ("alice", "alices_house"),
    ("bob", "bobs_house"),
    ("charlie", "charlies_house"),
];

// Building -> Region
const BUILDING_LOCATIONS: &[(&str, &str)] = &[
    ("daniels_house", "canada"),
    ("sylvains_house", "redmond"),
    ("allens_house", "socal"),
    ("ryans_house", "redmond"),
    ("nicoles_house", "socal"),
    ("donovans_house", "houston"),
    ("marks_house", "redmond"),
    ("city_center", "redmond"),
    ("building_20", "redmond"),
    ("building_99", "redmond"),
    ("alices_house", "socal"),
    ("bobs_house", "redmond"),
    ("charlies_house", "canada"),
];

// Incident -> Region
const INCIDENT_LOCATIONS: &[(&str, &str)] = &[
    ("famine", "canada"),
    ("flood", "redmond"),
    ("storm", "houston"),
    ("fire", "socal"),
];

const SAMPLE_LABELS: &[&str] = &["Employee", "Team", "Building", "Region", "Incident"];

struct LoaderSettings {
    uri: String,
    user: String,
    password: String,
}

impl LoaderSettings {
    fn from_env() -> Self {
        let mut settings = LoaderSettings {
            uri: "bolt://localhost:7687".to_string(),
            user: "neo4j".to_string(),
            password: "password".to_string(),
        };
        if let Ok(uri) = env::var("NEO4J_URI") {
            settings.uri = uri;
        }
        if let Ok(user) = env::var("NEO4J_USER") {
            settings.user = user;
        }
        if let Ok(password) = env::var("NEO4J_PASSWORD") {
            settings.password = password;
        }
        settings
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let settings = LoaderSettings::from_env();
    info!("Connecting to {} as {}", settings.uri, settings.user);
    let config = ConfigBuilder::default()
        .uri(&settings.uri)
        .user(&settings.user)
        .password(&settings.password)
        .build()
        .context("Invalid graph connection settings")?;
    let graph = Graph::connect(config)
        .await
        .context("Failed to connect to the graph")?;

    cleanup_sample_data(&graph).await?;
    insert_vertices(&graph).await?;
    insert_edges(&graph).await?;

    info!("Sample graph loaded");
    Ok(())
}

async fn cleanup_sample_data(graph: &Graph) -> anyhow::Result<()> {
    info!("Removing any existing sample data");
    for label in SAMPLE_LABELS {
        let statement = format!("MATCH (n:{}) DETACH DELETE n", label);
        graph
            .run(Query::new(statement))
            .await
            .with_context(|| format!("Failed to remove existing {} nodes", label))?;
    }
    Ok(())
}

async fn insert_vertices(graph: &Graph) -> anyhow::Result<()> {
    for (id, name, gender, email) in EMPLOYEES {
        let query = Query::new(
            "CREATE (:Employee {id: $id, name: $name, gender: $gender, email: $email})"
                .to_string(),
        )
        .param("id", *id)
        .param("name", *name)
        .param("gender", *gender)
        .param("email", *email);
        graph
            .run(query)
            .await
            .with_context(|| format!("Failed to create employee {}", id))?;
    }
    info!("Created {} employees", EMPLOYEES.len());

    for (label, rows) in [("Team", TEAMS), ("Building", BUILDINGS), ("Region", REGIONS)] {
        for (id, name) in rows {
            let statement = format!("CREATE (:{} {{id: $id, name: $name}})", label);
            let query = Query::new(statement).param("id", *id).param("name", *name);
            graph
                .run(query)
                .await
                .with_context(|| format!("Failed to create {} {}", label, id))?;
        }
        info!("Created {} {} nodes", rows.len(), label);
    }

    for (id, name, description, severity) in INCIDENTS {
        let query = Query::new(
            "CREATE (:Incident {id: $id, name: $name, description: $description, severity: $severity})"
                .to_string(),
        )
        .param("id", *id)
        .param("name", *name)
        .param("description", *description)
        .param("severity", *severity);
        graph
            .run(query)
            .await
            .with_context(|| format!("Failed to create incident {}", id))?;
    }
    info!("Created {} incidents", INCIDENTS.len());

    Ok(())
}

async fn insert_edges(graph: &Graph) -> anyhow::Result<()> {
    let phases = [
        ("Employee", "assigned_to", "Team", ASSIGNMENTS),
        ("Employee", "manages", "Team", MANAGERS),
        ("Employee", "located_in", "Building", EMPLOYEE_LOCATIONS),
        ("Building", "located_in", "Region", BUILDING_LOCATIONS),
        ("Incident", "occurs_in", "Region", INCIDENT_LOCATIONS),
    ];

    for (from_label, relation, to_label, pairs) in phases {
        for (from_id, to_id) in pairs {
            relate(graph, from_label, from_id, relation, to_label, to_id).await?;
        }
        info!(
            "Created {} {} relationships from {} to {}",
            pairs.len(),
            relation,
            from_label,
            to_label
        );
    }

    Ok(())
}

async fn relate(
    graph: &Graph,
    from_label: &str,
    from_id: &str,
    relation: &str,
    to_label: &str,
    to_id: &str,
) -> anyhow::Result<()> {
    let statement = format!(
        "MATCH (from:{} {{id: $from_id}}) MATCH (to:{} {{id: $to_id}}) CREATE (from)-[:{}]->(to)",
        from_label, to_label, relation
    );
    let query = Query::new(statement)
        .param("from_id", from_id)
        .param("to_id", to_id);
    graph.run(query).await.with_context(|| {
        format!(
            "Failed to create {} relationship from {} to {}",
            relation, from_id, to_id
        )
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn every_edge_references_a_defined_vertex() {
        let employees: HashSet<_> = EMPLOYEES.iter().map(|(id, ..)| *id).collect();
        let teams: HashSet<_> = TEAMS.iter().map(|(id, _)| *id).collect();
        let buildings: HashSet<_> = BUILDINGS.iter().map(|(id, _)| *id).collect();
        let regions: HashSet<_> = REGIONS.iter().map(|(id, _)| *id).collect();
        let incidents: HashSet<_> = INCIDENTS.iter().map(|(id, ..)| *id).collect();

        for (employee, team) in ASSIGNMENTS.iter().chain(MANAGERS) {
            assert!(employees.contains(employee), "unknown employee {}", employee);
            assert!(teams.contains(team), "unknown team {}", team);
        }
        for (employee, building) in EMPLOYEE_LOCATIONS {
            assert!(employees.contains(employee), "unknown employee {}", employee);
            assert!(buildings.contains(building), "unknown building {}", building);
        }
        for (building, region) in BUILDING_LOCATIONS {
            assert!(buildings.contains(building), "unknown building {}", building);
            assert!(regions.contains(region), "unknown region {}", region);
        }
        for (incident, region) in INCIDENT_LOCATIONS {
            assert!(incidents.contains(incident), "unknown incident {}", incident);
            assert!(regions.contains(region), "unknown region {}", region);
        }
    }

    #[test]
    fn every_employee_has_a_team_and_a_location() {
        let assigned: HashSet<_> = ASSIGNMENTS.iter().map(|(id, _)| *id).collect();
        let located: HashSet<_> = EMPLOYEE_LOCATIONS.iter().map(|(id, _)| *id).collect();
        for (id, ..) in EMPLOYEES {
            assert!(assigned.contains(id), "employee {} has no team", id);
            assert!(located.contains(id), "employee {} has no location", id);
        }
    }

    #[test]
    fn every_building_is_in_a_region() {
        let located: HashSet<_> = BUILDING_LOCATIONS.iter().map(|(id, _)| *id).collect();
        for (id, _) in BUILDINGS {
            assert!(located.contains(id), "building {} has no region", id);
        }
    }
}
