//! Block-sparse matrix used for the collocation Jacobian.
//!
//! The matrix is an arena of dense blocks addressed by their upper-left corner. The
//! `(row, col) -> block` index map makes the sparsity pattern explicit: the assembler
//! registers exactly the blocks the discretization couples, and tests can inspect them
//! without looking at individual entries. For factorization the arena is flattened
//! into triplets and compressed into a faer `SparseColMat`.
use crate::numerical::BVP_DAE::BVP_DAE_errors::BvpDaeError;
use faer::sparse::{SparseColMat, Triplet};
use log::{info, warn};
use nalgebra::DMatrix;
use std::collections::HashMap;
use sysinfo::System;

pub type faer_mat = SparseColMat<usize, f64>;

#[derive(Debug, Clone, PartialEq)]
pub struct DenseBlock {
    pub row: usize,
    pub col: usize,
    pub values: DMatrix<f64>,
}

#[derive(Debug, Clone)]
pub struct BlockSparseMatrix {
    nrows: usize,
    ncols: usize,
    blocks: Vec<DenseBlock>,
    index: HashMap<(usize, usize), usize>,
}

impl BlockSparseMatrix {
    pub fn new(nrows: usize, ncols: usize) -> Self {
        BlockSparseMatrix {
            nrows,
            ncols,
            blocks: Vec::new(),
            index: HashMap::new(),
        }
    }
    pub fn shape(&self) -> (usize, usize) {
        (self.nrows, self.ncols)
    }
    pub fn n_blocks(&self) -> usize {
        self.blocks.len()
    }
    pub fn blocks(&self) -> &[DenseBlock] {
        &self.blocks
    }
    pub fn block(&self, row: usize, col: usize) -> Option<&DMatrix<f64>> {
        self.index.get(&(row, col)).map(|&k| &self.blocks[k].values)
    }

    /// Adds `scale * values` at (row, col). A second call with the same corner accumulates
    /// into the existing block, which must then have the same shape.
    pub fn add_block(&mut self, row: usize, col: usize, values: &DMatrix<f64>, scale: f64) {
        let (r, c) = values.shape();
        assert!(
            row + r <= self.nrows && col + c <= self.ncols,
            "block ({}, {}) of shape ({}, {}) does not fit into ({}, {})",
            row,
            col,
            r,
            c,
            self.nrows,
            self.ncols
        );
        match self.index.get(&(row, col)) {
            Some(&k) => {
                let existing = &mut self.blocks[k].values;
                assert_eq!(existing.shape(), (r, c), "accumulated blocks must share the shape");
                *existing += values * scale;
            }
            None => {
                self.index.insert((row, col), self.blocks.len());
                self.blocks.push(DenseBlock {
                    row,
                    col,
                    values: values * scale,
                });
            }
        }
    }

    pub fn add_identity(&mut self, row: usize, col: usize, n: usize, scale: f64) {
        self.add_block(row, col, &DMatrix::identity(n, n), scale);
    }

    /// number of stored entries (exact zeros inside blocks included)
    pub fn stored_entries(&self) -> usize {
        self.blocks.iter().map(|b| b.values.len()).sum()
    }

    /// triplets of all nonzero entries; exact zeros are dropped like in the dense-to-sparse conversions elsewhere
    pub fn to_triplets(&self) -> Vec<Triplet<usize, usize, f64>> {
        let mut triplets = Vec::with_capacity(self.stored_entries());
        for block in &self.blocks {
            let (r, c) = block.values.shape();
            for j in 0..c {
                for i in 0..r {
                    let val = block.values[(i, j)];
                    if val != 0.0 {
                        triplets.push(Triplet::new(block.row + i, block.col + j, val));
                    }
                }
            }
        }
        triplets
    }

    pub fn to_faer(&self) -> Result<faer_mat, BvpDaeError> {
        let triplets = self.to_triplets();
        SparseColMat::try_new_from_triplets(self.nrows, self.ncols, &triplets).map_err(|e| {
            BvpDaeError::LinearAlgebra(format!("failed to build sparse Jacobian: {:?}", e))
        })
    }

    pub fn to_dense(&self) -> DMatrix<f64> {
        let mut dense = DMatrix::zeros(self.nrows, self.ncols);
        for block in &self.blocks {
            let (r, c) = block.values.shape();
            let mut view = dense.view_mut((block.row, block.col), (r, c));
            view += &block.values;
        }
        dense
    }
}

/// memory needed for the nonzeros of a sparse Jacobian, MB
pub fn jacobian_memory_mb(nnz: usize) -> f64 {
    (nnz * (std::mem::size_of::<f64>() + std::mem::size_of::<usize>())) as f64 / (1024.0 * 1024.0)
}

/// Warns if the Jacobian would take more than 80% of the free memory. Returns the estimate in MB.
pub fn check_jacobian_memory(nnz: usize) -> f64 {
    let matrix_memory = jacobian_memory_mb(nnz);
    let mut sys = System::new();
    sys.refresh_memory();
    let free_memory = sys.available_memory() as f64 / (1024.0 * 1024.0);
    if free_memory > 0.0 && matrix_memory > 0.8 * free_memory {
        warn!(
            "Jacobian needs {:.2} MB, which is more than 80% of free memory ({:.2} MB)",
            matrix_memory, free_memory
        );
    } else {
        info!("Jacobian memory estimate: {:.3} MB", matrix_memory);
    }
    matrix_memory
}
