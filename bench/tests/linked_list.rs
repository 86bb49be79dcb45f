use tmsync_bench::{LinkedList, Position, PositionError};

#[test]
fn test_basic() {
    let mut m = LinkedList::<Box<_>>::new();
    assert_eq!(m.pop_front(), None);
    assert_eq!(m.pop_back(), None);
    assert_eq!(m.pop_front(), None);
    let _ = m.push_front(Box::new(1));
    assert_eq!(m.pop_front(), Some(Box::new(1)));
    let _ = m.push_back(Box::new(2));
    let _ = m.push_back(Box::new(3));
    assert_eq!(m.len(), 2);
    assert_eq!(m.pop_front(), Some(Box::new(2)));
    assert_eq!(m.pop_front(), Some(Box::new(3)));
    assert_eq!(m.len(), 0);
    assert_eq!(m.pop_front(), None);
    let _ = m.push_back(Box::new(1));
    let _ = m.push_back(Box::new(3));
    let _ = m.push_back(Box::new(5));
    let _ = m.push_back(Box::new(7));
    assert_eq!(m.pop_front(), Some(Box::new(1)));

    let mut n = LinkedList::new();
    let _ = n.push_front(2);
    let _ = n.push_front(3);
    {
        assert_eq!(n.front().unwrap(), &3);
        let x = n.front_mut().unwrap();
        assert_eq!(*x, 3);
        *x = 0;
    }
    {
        assert_eq!(n.back().unwrap(), &2);
        let y = n.back_mut().unwrap();
        assert_eq!(*y, 2);
        *y = 1;
    }
    assert_eq!(n.pop_front(), Some(0));
    assert_eq!(n.pop_front(), Some(1));
}

fn generate_test() -> LinkedList<i32> {
    list_from(&[0, 1, 2, 3, 4, 5, 6])
}

fn list_from<T: Clone>(v: &[T]) -> LinkedList<T> {
    v.iter().cloned().collect()
}

#[test]
fn test_iterator() {
    let m = generate_test();
    for (i, elt) in m.iter().enumerate() {
        assert_eq!(i as i32, *elt);
    }
    let mut n = LinkedList::new();
    assert_eq!(n.iter().next(), None);
    let _ = n.push_front(4);
    let mut it = n.iter();
    assert_eq!(it.next().unwrap(), &4);
    assert_eq!(it.next(), None);
}

#[test]
fn test_iterator_clone() {
    let mut n = LinkedList::new();
    let _ = n.push_back(2);
    let _ = n.push_back(3);
    let _ = n.push_back(4);
    let mut it = n.iter();
    let _ = it.next();
    let mut jt = it.clone();
    assert_eq!(it.next(), jt.next());
    assert_eq!(it.next_back(), jt.next_back());
    assert_eq!(it.next(), jt.next());
}

#[test]
fn test_iterator_double_end() {
    let mut n = LinkedList::new();
    assert_eq!(n.iter().next(), None);
    let _ = n.push_front(4);
    let _ = n.push_front(5);
    let _ = n.push_front(6);
    let mut it = n.iter();
    assert_eq!(it.size_hint(), (3, Some(3)));
    assert_eq!(it.next().unwrap(), &6);
    assert_eq!(it.size_hint(), (2, Some(2)));
    assert_eq!(it.next_back().unwrap(), &4);
    assert_eq!(it.size_hint(), (1, Some(1)));
    assert_eq!(it.next_back().unwrap(), &5);
    assert_eq!(it.next_back(), None);
    assert_eq!(it.next(), None);
}

#[test]
fn test_eq() {
    let mut n = list_from(&[]);
    let mut m = list_from(&[]);
    assert!(n == m);
    let _ = n.push_front(1);
    assert!(n != m);
    let _ = m.push_back(1);
    assert!(n == m);

    let n = list_from(&[2, 3, 4]);
    let m = list_from(&[1, 2, 3]);
    assert!(n != m);
}

#[test]
fn test_debug() {
    let list: LinkedList<i32> = (0..10).collect();
    assert_eq!(format!("{list:?}"), "[0, 1, 2, 3, 4, 5, 6, 7, 8, 9]");

    let list: LinkedList<&str> = vec!["just", "one", "test", "more"].into_iter().collect();
    assert_eq!(format!("{list:?}"), r#"["just", "one", "test", "more"]"#);
}

#[test]
fn test_walk_and_insert() {
    let mut list = generate_test();
    let mut pos = list.begin();
    while !pos.is_end() {
        let value = *list.get(pos).unwrap();
        if value % 2 == 0 {
            pos = list.insert(pos, value * 10).unwrap();
        }
        pos = list.next(pos).unwrap();
    }
    assert!(list
        .iter()
        .copied()
        .eq([0, 0, 1, 2, 20, 3, 4, 40, 5, 6, 60]));
}

#[test]
fn test_remove_while_walking() {
    let mut list: LinkedList<i32> = (0..20).collect();
    let mut pos = list.begin();
    while !pos.is_end() {
        if list.get(pos).unwrap() % 3 == 0 {
            let (_, next) = list.remove(pos).unwrap();
            assert_eq!(list.get(pos), Err(PositionError::Stale));
            pos = next;
        } else {
            pos = list.next(pos).unwrap();
        }
    }
    assert!(list.iter().all(|v| v % 3 != 0));
    assert_eq!(list.len(), 13);
}

#[test]
fn test_clear_invalidates_positions() {
    let mut list = generate_test();
    let pos = list.begin();
    list.clear();
    assert!(list.is_empty());
    assert_eq!(list.get(pos), Err(PositionError::Stale));
    assert_eq!(list.get(Position::END), Err(PositionError::End));
    let _ = list.push_back(1);
    assert_eq!(list.get(pos), Err(PositionError::Stale));
}
