use std::fmt::Debug;

use bitvec::prelude::BitVec;
use smallvec::SmallVec;

/// Interference graph over the dense register numbering
/// Precolored nodes have an infinite degree and no adjacency list of their own,
/// their edges are only visible through the bit matrix and their neighbors
pub struct InterferenceGraph {
    pub bit_matrix: BitMatrix,
    pub adjacency_list: Vec<SmallVec<[u32; 8]>>,
    pub degree: Vec<usize>,
    // Indices into the move list of the build phase
    pub move_list: Vec<SmallVec<[u32; 4]>>,
    pub alias: Vec<Option<u32>>,
    pub color: Vec<Option<usize>>,
    precolored_from: u32,
    pub length: usize,
}

impl InterferenceGraph {
    pub fn new(length: usize, precolored_from: u32) -> InterferenceGraph {
        let mut degree = vec![0; length];
        let mut color = vec![None; length];
        for i in precolored_from as usize..length {
            degree[i] = usize::MAX;
            color[i] = Some(i - precolored_from as usize);
        }

        InterferenceGraph {
            bit_matrix: BitMatrix::new(length),
            adjacency_list: vec![SmallVec::new(); length],
            degree,
            move_list: vec![SmallVec::new(); length],
            alias: vec![None; length],
            color,
            precolored_from,
            length,
        }
    }

    pub fn is_precolored(&self, n: u32) -> bool {
        n >= self.precolored_from
    }

    // Adding an existing edge changes nothing
    pub fn add_edge(&mut self, u: u32, v: u32) {
        if u == v || self.bit_matrix.replace(u, v, true) {
            return;
        }
        log::trace!("interfere {} {}", u, v);
        if !self.is_precolored(u) {
            self.adjacency_list[u as usize].push(v);
            self.degree[u as usize] += 1;
        }
        if !self.is_precolored(v) {
            self.adjacency_list[v as usize].push(u);
            self.degree[v as usize] += 1;
        }
    }

    pub fn interfere(&self, u: u32, v: u32) -> bool {
        u != v && self.bit_matrix.get(u, v)
    }

    pub fn add_move(&mut self, n: u32, m: u32) {
        let moves = &mut self.move_list[n as usize];
        if !moves.contains(&m) {
            moves.push(m);
        }
    }

    pub fn degree(&self, n: u32) -> usize {
        self.degree[n as usize]
    }

    // All edges as (smaller, larger) pairs
    pub fn edges(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (1..self.length as u32)
            .flat_map(move |j| (0..j).map(move |i| (i, j)))
            .filter(move |&(i, j)| self.bit_matrix.get(i, j))
    }
}

impl Debug for InterferenceGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bitmatrix:{:?}", self.bit_matrix)?;
        writeln!(f, "adjacency lists:")?;
        for (node, adjacencies) in self.adjacency_list.iter().enumerate() {
            if !adjacencies.is_empty() {
                writeln!(f, "\t{} => {:?}", node, adjacencies)?;
            }
        }
        writeln!(f, "degree: {:?}", &self.degree[..self.precolored_from as usize])?;
        write!(f, "length: {}", self.length)
    }
}

/// Lower triangle of a symmetric boolean matrix without its diagonal
pub struct BitMatrix {
    vector: BitVec,
    size: usize,
}

impl BitMatrix {
    pub fn new(size: usize) -> BitMatrix {
        let len = (size * size + 1) / 2;
        BitMatrix {
            vector: BitVec::repeat(false, len),
            size,
        }
    }
    fn to_index(x: u32, y: u32) -> usize {
        assert_ne!(x, y);
        let i = std::cmp::min(x, y) as usize;
        let j = std::cmp::max(x, y) as usize;
        (j * (j - 1)) / 2 + i
    }
    pub fn get(&self, x: u32, y: u32) -> bool {
        let index = BitMatrix::to_index(x, y);
        self.vector[index]
    }
    // Returns the previous value
    pub fn replace(&mut self, x: u32, y: u32, value: bool) -> bool {
        let index = BitMatrix::to_index(x, y);
        self.vector.replace(index, value)
    }
    pub fn len(&self) -> usize {
        self.size
    }
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

impl Debug for BitMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        for i in 1..self.size {
            write!(f, "{:4}:[", i)?;
            for j in 0..i {
                write!(f, "{}", self.get(i as u32, j as u32) as u32)?;
            }
            writeln!(f, "]")?;
        }
        Ok(())
    }
}
