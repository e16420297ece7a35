use mongodb::bson::{Bson, Document, doc};
use serde::{Deserialize, Serialize};

use crate::dao::models::{Filter, FilterValue, MAX_PLAYERS, MatchEntity, UserEntity};

/// Stored shape of a `users` document. `_id` is assigned by the server and ignored on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoUserDocument {
    username: String,
    password: String,
    salt: String,
}

impl From<UserEntity> for MongoUserDocument {
    fn from(value: UserEntity) -> Self {
        Self {
            username: value.username,
            password: value.password,
            salt: value.salt,
        }
    }
}

impl From<MongoUserDocument> for UserEntity {
    fn from(value: MongoUserDocument) -> Self {
        Self {
            username: value.username,
            password: value.password,
            salt: value.salt,
        }
    }
}

/// Stored shape of a `games` document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMatchDocument {
    #[serde(rename = "_id")]
    id: String,
    open: bool,
    #[serde(rename = "numPlayers")]
    num_players: i32,
    #[serde(default)]
    players: Vec<String>,
}

impl From<MatchEntity> for MongoMatchDocument {
    fn from(value: MatchEntity) -> Self {
        Self {
            id: value.id,
            open: value.open,
            num_players: value.num_players,
            players: value.players,
        }
    }
}

impl From<MongoMatchDocument> for MatchEntity {
    fn from(value: MongoMatchDocument) -> Self {
        Self {
            id: value.id,
            open: value.open,
            num_players: value.num_players,
            players: value.players,
        }
    }
}

impl From<&FilterValue> for Bson {
    fn from(value: &FilterValue) -> Self {
        match value {
            FilterValue::Str(text) => Bson::String(text.clone()),
            FilterValue::Int(number) => Bson::Int64(*number),
            FilterValue::Bool(flag) => Bson::Boolean(*flag),
        }
    }
}

/// Translate an equality filter into a query document.
pub fn filter_document(filter: &Filter) -> Document {
    filter
        .iter()
        .map(|(field, value)| (field.to_owned(), Bson::from(value)))
        .collect()
}

/// Condition under which `player` may take a seat in match `title`.
pub fn join_guard(title: &str, player: &str) -> Document {
    doc! {
        "_id": title,
        "numPlayers": { "$lt": MAX_PLAYERS },
        "players": { "$ne": player },
    }
}

/// Seat `player`: bump the count and append to the roster in the same update.
pub fn join_update(player: &str) -> Document {
    doc! {
        "$inc": { "numPlayers": 1 },
        "$push": { "players": player },
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{deserialize_from_document, serialize_to_document};

    use super::*;

    #[test]
    fn match_document_uses_stored_field_names() {
        let document = serialize_to_document(&MongoMatchDocument::from(MatchEntity::new("t")))
            .unwrap();
        assert_eq!(
            document,
            doc! { "_id": "t", "open": false, "numPlayers": 0, "players": [] }
        );
    }

    #[test]
    fn match_document_without_players_reads_as_empty_roster() {
        let stored: MongoMatchDocument =
            deserialize_from_document(doc! { "_id": "t", "open": true, "numPlayers": 0 })
                .unwrap();
        let game = MatchEntity::from(stored);
        assert!(game.open);
        assert!(game.players.is_empty());
    }

    #[test]
    fn user_document_has_no_id_of_its_own() {
        let user = UserEntity {
            username: "alice".into(),
            password: "digest".into(),
            salt: "salt".into(),
        };
        let document = serialize_to_document(&MongoUserDocument::from(user)).unwrap();
        assert_eq!(
            document,
            doc! { "username": "alice", "password": "digest", "salt": "salt" }
        );
    }

    #[test]
    fn filter_keeps_field_names_and_types() {
        let filter = Filter::by_id("t").with("numPlayers", 0).with("open", false);
        assert_eq!(
            filter_document(&filter),
            doc! { "_id": "t", "numPlayers": 0_i64, "open": false }
        );
        assert!(filter_document(&Filter::new()).is_empty());
    }

    #[test]
    fn join_guard_requires_free_seat_and_absent_player() {
        assert_eq!(
            join_guard("t", "alice"),
            doc! {
                "_id": "t",
                "numPlayers": { "$lt": 2 },
                "players": { "$ne": "alice" },
            }
        );
    }

    #[test]
    fn join_update_increments_and_pushes_together() {
        assert_eq!(
            join_update("alice"),
            doc! {
                "$inc": { "numPlayers": 1 },
                "$push": { "players": "alice" },
            }
        );
    }
}
