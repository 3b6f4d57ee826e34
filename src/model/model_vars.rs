//! Decision variables: one occupancy and one block-start literal per
//! (session, timeslot, room) triple, stored densely.
use std::collections::HashMap;

use cp_sat::builder::{BoolVar, CpModelBuilder};
use cp_sat::proto::CpSolverResponse;

use crate::config::Timeslot;
use crate::data::{RoomId, SessionId};

/// Dense position of a session or room inside the registry.
pub type Index = usize;

pub struct VariableRegistry {
    sessions: Vec<SessionId>,
    rooms: Vec<RoomId>,
    session_index: HashMap<SessionId, Index>,
    num_slots: u32,
    occupied: Vec<BoolVar>,
    starts: Vec<BoolVar>,
}

impl VariableRegistry {
    /// Allocates the full cross product sessions × timeslots × rooms.
    /// With `named` set, every literal carries its `x`/`b` label.
    pub fn allocate(
        model: &mut CpModelBuilder,
        sessions: &[SessionId],
        num_slots: u32,
        rooms: &[RoomId],
        named: bool,
    ) -> Self {
        let size = sessions.len() * num_slots as usize * rooms.len();
        let mut occupied = Vec::with_capacity(size);
        let mut starts = Vec::with_capacity(size);
        for &s in sessions {
            for t in 0..num_slots {
                for &r in rooms {
                    if named {
                        occupied.push(model.new_bool_var_with_name(format!("x{s}%{t}%{r}")));
                        starts.push(model.new_bool_var_with_name(format!("b{s}%{t}%{r}")));
                    } else {
                        occupied.push(model.new_bool_var());
                        starts.push(model.new_bool_var());
                    }
                }
            }
        }
        Self {
            session_index: sessions.iter().enumerate().map(|(i, &s)| (s, i)).collect(),
            sessions: sessions.to_vec(),
            rooms: rooms.to_vec(),
            num_slots,
            occupied,
            starts,
        }
    }

    #[inline]
    fn offset(&self, s: Index, t: Timeslot, r: Index) -> usize {
        (s * self.num_slots as usize + t as usize) * self.rooms.len() + r
    }

    pub fn occupied(&self, s: Index, t: Timeslot, r: Index) -> BoolVar {
        self.occupied[self.offset(s, t, r)].clone()
    }

    pub fn starts(&self, s: Index, t: Timeslot, r: Index) -> BoolVar {
        self.starts[self.offset(s, t, r)].clone()
    }

    /// Dense position of a session id, `None` for ids not in the registry.
    pub fn session_index(&self, session: SessionId) -> Option<Index> {
        self.session_index.get(&session).copied()
    }

    pub fn len(&self) -> usize {
        self.occupied.len() + self.starts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.occupied.is_empty()
    }

    /// Every (timeslot, session, room) whose occupancy literal is true in `response`.
    pub fn occupied_cells(&self, response: &CpSolverResponse) -> Vec<(Timeslot, SessionId, RoomId)> {
        let mut cells = Vec::new();
        for (si, &s) in self.sessions.iter().enumerate() {
            for t in 0..self.num_slots {
                for (ri, &r) in self.rooms.iter().enumerate() {
                    if self.occupied(si, t, ri).solution_value(response) {
                        cells.push((t, s, r));
                    }
                }
            }
        }
        cells
    }
}
