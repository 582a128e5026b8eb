use rand::Rng;
use std::collections::{HashSet, VecDeque};
use tracing::debug;

/// Elemento que sabe a quién pertenece dentro de la cola justa
pub trait Queueable {
    /// Identificador del solicitante (0 = autoplay)
    fn identifier(&self) -> u64;
}

/// Cola justa: los pedidos de distintos usuarios se intercalan por rondas.
///
/// Un pedido nuevo se inserta después del último pedido del mismo usuario y
/// antes de la primera ronda donde algún usuario repetiría. Con un solo
/// usuario equivale a FIFO.
#[derive(Debug)]
pub struct FairQueue<T: Queueable> {
    items: VecDeque<T>,
}

impl<T: Queueable> Default for FairQueue<T> {
    fn default() -> Self {
        Self {
            items: VecDeque::new(),
        }
    }
}

impl<T: Queueable> FairQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserta en la posición justa y devuelve el índice resultante
    pub fn add(&mut self, item: T) -> usize {
        let id = item.identifier();

        let mut index = self
            .items
            .iter()
            .rposition(|queued| queued.identifier() == id)
            .map(|last| last + 1)
            .unwrap_or(0);

        let mut seen = HashSet::new();
        while index < self.items.len() {
            if !seen.insert(self.items[index].identifier()) {
                break;
            }
            index += 1;
        }

        self.items.insert(index, item);
        debug!("➕ Pedido de {} insertado en posición {}", id, index);
        index
    }

    /// Inserta en una posición exacta (acotada al final)
    pub fn add_at(&mut self, index: usize, item: T) {
        let index = index.min(self.items.len());
        self.items.insert(index, item);
    }

    pub fn pull(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn remove(&mut self, index: usize) -> Option<T> {
        self.items.remove(index)
    }

    /// Elimina todos los pedidos de un usuario
    pub fn remove_all(&mut self, identifier: u64) -> usize {
        let before = self.items.len();
        self.items.retain(|item| item.identifier() != identifier);
        before - self.items.len()
    }

    /// Mezcla solo las posiciones que ocupan los pedidos de un usuario
    pub fn shuffle(&mut self, identifier: u64) -> usize {
        let positions: Vec<usize> = self
            .items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.identifier() == identifier)
            .map(|(i, _)| i)
            .collect();

        let mut rng = rand::thread_rng();
        for j in (1..positions.len()).rev() {
            let k = rng.gen_range(0..=j);
            self.items.swap(positions[j], positions[k]);
        }

        positions.len()
    }

    /// Descarta los primeros `count` pedidos
    pub fn skip(&mut self, count: usize) {
        let count = count.min(self.items.len());
        self.items.drain(..count);
    }

    pub fn move_item(&mut self, from: usize, to: usize) -> Option<&T> {
        let item = self.items.remove(from)?;
        let to = to.min(self.items.len());
        self.items.insert(to, item);
        self.items.get(to)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Debug, Clone, PartialEq)]
    struct Req(u64, &'static str);

    impl Queueable for Req {
        fn identifier(&self) -> u64 {
            self.0
        }
    }

    fn names(queue: &FairQueue<Req>) -> Vec<&'static str> {
        queue.iter().map(|r| r.1).collect()
    }

    #[test]
    fn test_single_user_is_fifo() {
        let mut queue = FairQueue::new();
        assert_eq!(queue.add(Req(1, "a")), 0);
        assert_eq!(queue.add(Req(1, "b")), 1);
        assert_eq!(queue.add(Req(1, "c")), 2);

        assert_eq!(queue.pull(), Some(Req(1, "a")));
        assert_eq!(names(&queue), vec!["b", "c"]);
    }

    #[test]
    fn test_users_are_interleaved() {
        let mut queue = FairQueue::new();
        queue.add(Req(1, "a1"));
        queue.add(Req(1, "a2"));
        queue.add(Req(1, "a3"));
        assert_eq!(queue.add(Req(2, "b1")), 1);
        assert_eq!(queue.add(Req(2, "b2")), 3);
        assert_eq!(queue.add(Req(3, "c1")), 2);

        assert_eq!(names(&queue), vec!["a1", "b1", "c1", "a2", "b2", "a3"]);
    }

    #[test]
    fn test_add_at_front_and_clamped() {
        let mut queue = FairQueue::new();
        queue.add(Req(1, "a"));
        queue.add_at(0, Req(2, "front"));
        queue.add_at(99, Req(3, "back"));

        assert_eq!(names(&queue), vec!["front", "a", "back"]);
    }

    #[test]
    fn test_remove_all_skip_and_move() {
        let mut queue = FairQueue::new();
        queue.add(Req(1, "a1"));
        queue.add(Req(2, "b1"));
        queue.add(Req(1, "a2"));
        queue.add(Req(2, "b2"));

        assert_eq!(queue.remove_all(2), 2);
        assert_eq!(names(&queue), vec!["a1", "a2"]);

        queue.move_item(1, 0);
        assert_eq!(names(&queue), vec!["a2", "a1"]);

        queue.skip(5);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_shuffle_keeps_other_users_in_place() {
        let mut queue = FairQueue::new();
        queue.add(Req(1, "a1"));
        queue.add(Req(2, "b1"));
        queue.add(Req(1, "a2"));
        queue.add(Req(2, "b2"));
        queue.add(Req(1, "a3"));

        assert_eq!(queue.shuffle(1), 3);
        assert_eq!(queue.get(1), Some(&Req(2, "b1")));
        assert_eq!(queue.get(3), Some(&Req(2, "b2")));
        assert_eq!(queue.len(), 5);
    }
}
