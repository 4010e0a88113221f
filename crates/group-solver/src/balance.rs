/// Running session totals per lecturer and per room. Lecturer and room
/// indices follow id order, so breaking ties on the index is breaking ties
/// on the id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LoadBalancer {
    lecturer_sessions: Vec<u32>,
    room_sessions: Vec<u32>,
}

impl LoadBalancer {
    pub fn new(lecturers: usize, rooms: usize) -> Self {
        Self {
            lecturer_sessions: vec![0; lecturers],
            room_sessions: vec![0; rooms],
        }
    }

    pub fn lecturer_load(&self, lecturer: u32) -> u32 {
        self.lecturer_sessions
            .get(lecturer as usize)
            .copied()
            .unwrap_or(0)
    }

    pub fn room_load(&self, room: u32) -> u32 {
        self.room_sessions.get(room as usize).copied().unwrap_or(0)
    }

    /// Least loaded first, ties by lowest index.
    pub fn lecturer_order(&self, candidates: &[u32]) -> Vec<u32> {
        let mut out = candidates.to_vec();
        out.sort_by_key(|&l| (self.lecturer_load(l), l));
        out.dedup();
        out
    }

    /// Smallest sufficient room first, then least used, then lowest index.
    /// `candidates` are `(room, capacity)` pairs.
    pub fn room_order(&self, candidates: &[(u32, u32)]) -> Vec<u32> {
        let mut out = candidates.to_vec();
        out.sort_by_key(|&(r, cap)| (cap, self.room_load(r), r));
        out.dedup();
        out.into_iter().map(|(r, _)| r).collect()
    }

    /// `rooms` are `(room, sessions held there)` pairs.
    pub fn record(&mut self, lecturer: u32, sessions: u32, rooms: &[(u32, u32)]) {
        if let Some(total) = self.lecturer_sessions.get_mut(lecturer as usize) {
            *total += sessions;
        }
        for &(r, n) in rooms {
            if let Some(total) = self.room_sessions.get_mut(r as usize) {
                *total += n;
            }
        }
    }

    pub fn lecturer_totals(&self) -> &[u32] {
        &self.lecturer_sessions
    }

    pub fn load_difference(&self) -> u32 {
        sched_core::scoring::load_difference(self.lecturer_sessions.iter().copied())
    }
}
