// Purpose - external interfaces: getting sound data into the mixer

pub mod wave;
