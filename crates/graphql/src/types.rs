//! GraphQL type definitions.

use async_graphql::{EmptyMutation, EmptySubscription, Schema};

use crate::schema::CustodyQuery;

/// The custody GraphQL schema type.
pub type CustodiaSchema = Schema<CustodyQuery, EmptyMutation, EmptySubscription>;
