//! Befores/Afters container for hook output

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::step::Step;
use crate::utils::timer::now_millis;

/// Steps recorded by setup and teardown hooks of a suite or a single test
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub uuid: Uuid,
    pub name: String,
    #[serde(default)]
    pub children: Vec<Uuid>,
    #[serde(default)]
    pub befores: Vec<Step>,
    #[serde(default)]
    pub afters: Vec<Step>,
    pub start: i64,
    pub stop: i64,
}

impl Container {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            uuid: Uuid::new_v4(),
            name: name.into(),
            children: Vec::new(),
            befores: Vec::new(),
            afters: Vec::new(),
            start: 0,
            stop: 0,
        }
    }

    pub fn begin(&mut self) {
        self.start = now_millis();
    }

    pub fn finish(&mut self) {
        if self.start == 0 {
            self.start = now_millis();
        }
        self.stop = now_millis();
    }

    pub fn add_child(&mut self, uuid: Uuid) {
        self.children.push(uuid);
    }

    pub fn is_empty(&self) -> bool {
        self.befores.is_empty() && self.afters.is_empty()
    }
}
