use std::collections::{HashMap, VecDeque};

use uuid::Uuid;

/// A request that can be matched with its response.
pub(crate) trait Identified {
    fn id(&self) -> Uuid;
}

/// FIFO of requests waiting for the page, plus the responses it sent back.
#[derive(Debug)]
pub(crate) struct RequestQueue<Req, Res> {
    requests: VecDeque<Req>,
    responses: HashMap<Uuid, Res>,
}

impl<Req, Res> Default for RequestQueue<Req, Res> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Req, Res> RequestQueue<Req, Res> {
    pub fn new() -> Self {
        Self { requests: VecDeque::new(), responses: HashMap::new() }
    }

    pub fn add_request(&mut self, request: Req) {
        self.requests.push_back(request);
    }

    /// The oldest pending request. It stays queued until answered or removed.
    pub fn read_request(&self) -> Option<&Req> {
        self.requests.front()
    }

    pub fn add_response(&mut self, id: Uuid, response: Res) {
        self.responses.insert(id, response);
    }

    /// Takes the response for `id`.
    pub fn get_response(&mut self, id: &Uuid) -> Option<Res> {
        self.responses.remove(id)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }
}

impl<Req: Identified, Res> RequestQueue<Req, Res> {
    pub fn has_request(&self, id: &Uuid) -> bool {
        self.requests.iter().any(|req| req.id() == *id)
    }

    pub fn remove_request(&mut self, id: &Uuid) {
        self.requests.retain(|req| req.id() != *id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Req(Uuid);

    impl Identified for Req {
        fn id(&self) -> Uuid {
            self.0
        }
    }

    #[test]
    fn requests_are_served_in_order() {
        let mut queue = RequestQueue::<Req, &str>::new();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        queue.add_request(Req(a));
        queue.add_request(Req(b));

        assert_eq!(queue.read_request(), Some(&Req(a)));
        // reading does not consume
        assert_eq!(queue.read_request(), Some(&Req(a)));
        assert!(queue.has_request(&b));

        queue.remove_request(&a);
        assert_eq!(queue.read_request(), Some(&Req(b)));
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn responses_are_taken_once() {
        let mut queue = RequestQueue::<Req, &str>::new();
        let id = Uuid::new_v4();
        queue.add_response(id, "done");
        assert_eq!(queue.get_response(&id), Some("done"));
        assert_eq!(queue.get_response(&id), None);
    }
}
