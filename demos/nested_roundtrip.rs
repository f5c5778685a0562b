//! Builds a depth-3 tree node by node, reads parts of it back, and hands the
//! buffers to a second tree.

use flat_vect_tree::{vect_tree, Error, FlatVectTree, SharedFlatVectTree, VectTree};

fn main() -> Result<(), Error> {
    example_incremental()?;
    example_bulk()?;
    example_shared()?;
    Ok(())
}

fn example_incremental() -> Result<(), Error> {
    println!("=== Incremental (depth 3) ===\n");

    let mut tree: FlatVectTree<i32> = FlatVectTree::with_depth(3);

    // A top-level node, then children one level at a time.
    tree.push_back(VectTree::new(), None)?;
    tree.push_back(vect_tree![[1, 2], [3]], Some(1))?;
    tree.push_back(vect_tree![4, 5, 6], Some(0))?;
    tree.push_back(vect_tree![[[7]]], None)?;

    println!("partition_index = {:?}", tree.partition_index());
    println!("data = {:?}", tree.data());
    for level in 0..tree.depth() {
        println!("level {} holds {:?} node(s)", level, tree.level_size(level));
    }
    println!("tree = {:?}", tree.get_vect_tree(&[])?);
    println!("[0, 0] = {:?}", tree.get_vect_tree(&[0, 0])?);
    println!("leaves under [0] = {:?}\n", tree.leaves(&[0])?);

    if let Err(err) = tree.get_vect_tree(&[0, 3]) {
        println!("[0, 3] fails: {} ({:?})\n", err, err.code());
    }
    Ok(())
}

fn example_bulk() -> Result<(), Error> {
    println!("=== Bulk append and buffer hand-off ===\n");

    let rows: Vec<Vec<Vec<u16>>> = vec![vec![vec![1, 2], vec![]], vec![], vec![vec![3]]];
    let mut tree: FlatVectTree<u16> = FlatVectTree::with_depth(2);
    tree.append(rows.clone(), None)?;

    let back: Vec<Vec<Vec<u16>>> = tree.get_nested(&[])?;
    println!("round trip equal: {}", back == rows);

    let (partition_index, data) = tree.release_mem();
    println!("released tree is truly empty: {}", tree.is_truly_empty());

    let mut adopted = FlatVectTree::new();
    adopted.assign_parts_owned(partition_index, data, true)?;
    println!("adopted depth = {}, top-level nodes = {}\n", adopted.depth(), adopted.len());
    Ok(())
}

fn example_shared() -> Result<(), Error> {
    println!("=== SharedFlatVectTree ===\n");

    let shared: SharedFlatVectTree<u64> = SharedFlatVectTree::with_depth(1);
    std::thread::scope(|s| {
        for worker in 0..4u64 {
            let shared = &shared;
            s.spawn(move || {
                for i in 0..10 {
                    // Rows from different workers interleave, each stays whole.
                    shared
                        .push_back(vec![worker, i], None)
                        .expect("a depth-1 tree takes flat rows");
                }
            });
        }
    });
    println!("rows = {}", shared.len());
    println!("first row = {:?}", shared.get_vect_tree(&[0])?);
    Ok(())
}
