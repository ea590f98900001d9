pub mod graph_query;
pub mod neo4j;
pub mod recorded;
