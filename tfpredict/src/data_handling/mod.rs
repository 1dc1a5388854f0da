pub mod blast_hits;
pub mod fasta;
pub mod interpro;
