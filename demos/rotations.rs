//! Prints the preorder layout of small trees after each kind of rotation.

use avl_dict::{AvlTreeMap, Order};

fn build(keys: &[i32]) -> AvlTreeMap<i32, i32> {
    let mut map = AvlTreeMap::new();
    for key in keys {
        map.insert(*key, key * 10);
    }
    map
}

fn show(title: &str, map: &AvlTreeMap<i32, i32>) {
    println!("{title} (height {})", map.height());
    print!("{}", map.display(Order::Preorder));
    println!();
}

fn main() {
    show("insert 11, 12, 13", &build(&[11, 12, 13]));
    show("insert 11, 10, 9", &build(&[11, 10, 9]));
    show("insert 12, 10, 11", &build(&[12, 10, 11]));
    show("insert 10, 12, 11", &build(&[10, 12, 11]));

    let mut map = build(&[20, 10, 30, 5, 15]);
    show("insert 20, 10, 30, 5, 15", &map);
    map.remove(&30);
    show("remove 30", &map);
    map.remove(&10);
    show("remove 10", &map);

    let mut map = build(&[50, 40, 60, 30, 45, 55, 10]);
    map.remove(&55);
    show("insert 50, 40, 60, 30, 45, 55, 10 and remove 55", &map);

    let mut map = build(&[50, 40, 60, 55]);
    map.remove(&40);
    show("insert 50, 40, 60, 55 and remove 40", &map);
}
