pub mod errors;

pub mod factors {
    pub mod algebra;
    pub mod domains;
    pub mod factor;
    pub mod odometer;
}

pub mod data_structures {
    pub mod factor_arena;
}

pub mod network {
    pub mod markov_network;
}

pub mod elimination {
    pub mod ordering;
    pub mod variable_elimination;
}

pub mod bp {
    pub mod factor_graph;
    pub mod loopy_bp;
    pub mod messages;
    pub mod options;
}

pub mod io {
    pub mod output;
    pub mod uai;
}
