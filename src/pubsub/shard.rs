use std::{collections::HashMap, sync::Arc};

use parking_lot::RwLock;

use super::subscriber::Subscriber;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// 32-битный FNV-1a по байтам строки.
#[inline]
pub(crate) fn fnv1a(subject: &str) -> u32 {
    subject.bytes().fold(FNV_OFFSET_BASIS, |hash, byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV_PRIME)
    })
}

/// Индекс шарда для subject. Стабилен для заданного кол-ва шардов.
#[inline]
pub(crate) fn shard_index(
    subject: &str,
    shard_count: usize,
) -> usize {
    fnv1a(subject) as usize % shard_count
}

/// Фрагмент реестра subject → подписчики со своей блокировкой.
///
/// Порядок подписчиков внутри subject совпадает с порядком вставки и
/// никакого приоритета доставки не означает.
pub(crate) struct Shard<M> {
    subjects: RwLock<HashMap<Arc<str>, Vec<Arc<Subscriber<M>>>>>,
}

impl<M> Shard<M> {
    pub(crate) fn new() -> Self {
        Self {
            subjects: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) fn insert(
        &self,
        subscriber: Arc<Subscriber<M>>,
    ) {
        let mut subjects = self.subjects.write();
        subjects
            .entry(subscriber.subject().clone())
            .or_default()
            .push(subscriber);
    }

    /// Удаляет именно этот экземпляр (по указателю, а не по subject).
    ///
    /// Возвращает `true`, если подписчик был найден.
    pub(crate) fn remove(
        &self,
        subscriber: &Arc<Subscriber<M>>,
    ) -> bool {
        let mut subjects = self.subjects.write();
        let Some(list) = subjects.get_mut(subscriber.subject().as_ref()) else {
            return false;
        };
        let Some(pos) = list.iter().position(|s| Arc::ptr_eq(s, subscriber)) else {
            return false;
        };
        list.remove(pos);
        if list.is_empty() {
            subjects.remove(subscriber.subject().as_ref());
        }
        true
    }

    /// Копия списка подписчиков. Блокировка отпускается до доставки.
    pub(crate) fn snapshot(
        &self,
        subject: &str,
    ) -> Vec<Arc<Subscriber<M>>> {
        self.subjects
            .read()
            .get(subject)
            .map(|list| list.to_vec())
            .unwrap_or_default()
    }

    /// Очищает шард целиком. Возвращает кол-во снятых подписчиков.
    pub(crate) fn clear(&self) -> usize {
        let mut subjects = self.subjects.write();
        let removed = subjects.values().map(Vec::len).sum();
        subjects.clear();
        removed
    }

    pub(crate) fn subscriber_count(
        &self,
        subject: &str,
    ) -> usize {
        self.subjects.read().get(subject).map_or(0, Vec::len)
    }

    pub(crate) fn total_subscribers(&self) -> usize {
        self.subjects.read().values().map(Vec::len).sum()
    }

    pub(crate) fn subject_count(&self) -> usize {
        self.subjects.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Эталонные значения FNV-1a (32 бита).
    #[test]
    fn test_fnv1a_reference_vectors() {
        assert_eq!(fnv1a(""), 0x811c_9dc5);
        assert_eq!(fnv1a("a"), 0xe40c_292c);
        assert_eq!(fnv1a("foobar"), 0xbf9c_f968);
    }

    #[test]
    fn test_shard_index_is_stable_and_in_range() {
        for subject in ["orders", "users.created", "x", "очень.длинный.канал"] {
            let first = shard_index(subject, 32);
            assert!(first < 32);
            for _ in 0..10 {
                assert_eq!(shard_index(subject, 32), first);
            }
        }
    }

    /// Разные subject должны расходиться по разным шардам.
    #[test]
    fn test_shard_index_spreads_subjects() {
        let used: std::collections::HashSet<_> = (0..256)
            .map(|i| shard_index(&format!("subject-{i}"), 32))
            .collect();
        assert!(used.len() > 16, "only {} shards used", used.len());
    }
}
