use avl_dict::{AvlTreeMap, Error, Order};

fn main() {
    let mut map = AvlTreeMap::new();
    map.insert(0, "zero");
    map.insert(1, "one");
    map.insert(2, "two");
    assert!(!map.insert(2, "deux"));
    map.insert(3, "three");
    map.insert(4, "four");
    map.insert(5, "five");
    assert_eq!(map.get(&1), Some(&"one"));
    assert_eq!(map.get(&2), Some(&"two"));
    map.remove(&1);
    assert!(map.get(&1).is_none());

    for (k, v) in &map {
        println!("{k} => {v}");
    }

    match map.try_insert(3, "drei") {
        Ok(_) => unreachable!(),
        Err(err) => {
            assert_eq!(err, Error::DuplicateKey);
            println!("3 => {err}");
        }
    }

    let mut cursor = map.find(&3);
    print!("from 3 up: ");
    while !cursor.is_end() {
        print!("{} ", cursor.key());
        cursor.move_next();
    }
    println!();

    let mut cursor = map.rbegin();
    print!("descending: ");
    while cursor != map.rend() {
        print!("{} ", cursor.key());
        cursor.move_next();
    }
    println!();

    print!("{}", map.display(Order::Preorder));
}
