/// Overlay for the `Person` message
#[derive(Debug, Clone, PartialEq)]
pub struct Person {
    has_bits: u64,
    name: String,
    friends: Vec<Person>,
}

impl Default for Person {
    fn default() -> Self {
        Self::new()
    }
}

impl Person {
    /// Creates an instance with all fields unset
    pub fn new() -> Self {
        Self {
            has_bits: 0,
            name: String::new(),
            friends: Vec::new(),
        }
    }

    pub fn has_name(&self) -> bool {
        self.has_bits & (1 << 0) != 0
    }

    pub fn name(&self) -> &str {
        assert!(self.has_name(), "field 'name' is unset");
        self.name.as_str()
    }

    pub fn set_name(&mut self, value: String) {
        self.has_bits |= 1 << 0;
        self.name = value;
    }

    pub fn clear_name(&mut self) {
        self.has_bits &= !(1 << 0);
        self.name = String::new();
    }

    pub fn friends_count(&self) -> usize {
        self.friends.len()
    }

    pub fn friends(&self, idx: usize) -> &Person {
        assert!(idx < self.friends.len(), "index out of range for 'friends'");
        &self.friends[idx]
    }

    pub fn set_friends(&mut self, idx: usize, value: Person) {
        assert!(idx < self.friends.len(), "index out of range for 'friends'");
        self.friends[idx] = value;
    }

    /// Read-only view of the current elements
    pub fn friends_list(&self) -> &[Person] {
        &self.friends
    }

    pub fn clear_friends(&mut self) {
        self.friends.clear();
    }

    /// Appends a fresh default instance and returns it for population
    pub fn add_friends(&mut self) -> &mut Person {
        let idx = self.friends.len();
        self.friends.push(Person::new());
        &mut self.friends[idx]
    }
}

