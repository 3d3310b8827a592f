//! The five semantic passes, run in this fixed order against the same
//! `Program`: const-string folding, abstract-class checking, interface
//! checking, virtual-method discovery, type inference/checking.

pub mod abstract_check;
pub mod common;
pub mod const_fold;
pub mod interface_check;
pub mod type_inferrer;
pub mod virtual_methods;
